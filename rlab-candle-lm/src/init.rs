use anyhow::{Result, anyhow};
use candle_core::Tensor;
use candle_nn::VarMap;
use rand::rngs::StdRng;
use rlab_core::rng::sample_uniform_range;

/// Overwrites every parameter of `varmap` with draws from `rng`, uniform in
/// `±1/sqrt(fan_in)`. Biases use the fan-in of the weight sharing their prefix. Parameters are
/// visited in name order so the result only depends on the seed.
pub fn reseed_parameters(varmap: &VarMap, rng: &mut StdRng) -> Result<()> {
    let vars = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("parameter store lock is poisoned"))?;
    let mut names: Vec<&String> = vars.keys().collect();
    names.sort();
    for name in names {
        let var = &vars[name];
        let fan_in = match name.strip_suffix(".bias") {
            Some(prefix) => vars
                .get(&format!("{prefix}.weight"))
                .and_then(|weight| weight.dims().get(1).copied()),
            None => var.dims().get(1).copied(),
        }
        .unwrap_or_else(|| var.elem_count());
        let bound = 1. / (fan_in.max(1) as f64).sqrt();
        let values: Vec<f32> = (0..var.elem_count())
            .map(|_| sample_uniform_range(rng, -bound, bound) as f32)
            .collect();
        let tensor = Tensor::from_vec(values, var.dims().to_vec(), var.device())?;
        var.set(&tensor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequential::build_sequential;
    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;
    use rlab_core::rng::seeded;

    fn seeded_weights(seed: u64) -> Result<Vec<f32>> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        build_sequential(4, &[3, 2], &vb, "q")?;
        reseed_parameters(&varmap, &mut seeded(seed))?;
        let data = varmap
            .data()
            .lock()
            .map_err(|_| anyhow!("poisoned"))?;
        Ok(data["q0.weight"].flatten_all()?.to_vec1()?)
    }

    #[test]
    fn same_seed_same_parameters() -> Result<()> {
        assert_eq!(seeded_weights(11)?, seeded_weights(11)?);
        assert_ne!(seeded_weights(11)?, seeded_weights(12)?);
        Ok(())
    }

    #[test]
    fn parameters_stay_within_fan_in_bound() -> Result<()> {
        let bound = 1. / 2f32;
        assert!(seeded_weights(3)?.iter().all(|w| w.abs() <= bound));
        Ok(())
    }
}
