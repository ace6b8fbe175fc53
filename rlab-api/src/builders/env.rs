use rlab_core::error::{Result, RlError};
use rlab_envs::{
    EnvKind, blackjack::Blackjack, cart_pole::CartPole, mountain_car::MountainCar,
    shaped_cart_pole::ShapedCartPole,
};

/// Environment names accepted on the command line.
pub const ENVIRONMENT_NAMES: [&str; 4] =
    ["blackjack", "cart-pole", "shaped-cart-pole", "mountain-car"];

pub fn build_env(name: &str) -> Result<EnvKind> {
    match name {
        "blackjack" => Ok(EnvKind::Blackjack(Blackjack::default())),
        "cart-pole" => Ok(EnvKind::CartPole(CartPole::new())),
        "shaped-cart-pole" => Ok(EnvKind::ShapedCartPole(ShapedCartPole::default())),
        "mountain-car" => Ok(EnvKind::MountainCar(MountainCar::new())),
        other => Err(RlError::UnknownEnvironment(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlab_core::env::Env;

    #[test]
    fn every_listed_name_builds() -> Result<()> {
        let names: Vec<String> = ENVIRONMENT_NAMES
            .iter()
            .map(|name| build_env(name).map(|env| env.name().to_string()))
            .collect::<Result<_>>()?;
        assert_eq!(
            names,
            ["Blackjack", "CartPole", "ShapedCartPole", "MountainCar"]
        );
        Ok(())
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            build_env("pendulum"),
            Err(RlError::UnknownEnvironment(name)) if name == "pendulum"
        ));
    }
}
