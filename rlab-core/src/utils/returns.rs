const NORMALIZATION_EPSILON: f32 = 1e-9;

/// Monte-Carlo return-to-go for every timestep of an episode.
pub fn discounted_returns(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.; rewards.len()];
    let mut running = 0f32;
    for (i, reward) in rewards.iter().enumerate().rev() {
        running = reward + gamma * running;
        returns[i] = running;
    }
    returns
}

/// Shifts every return by `mean / (std + eps)`, where `std` is the population standard
/// deviation of the episode's returns.
///
/// NOTE: this is not the usual `(r - mean) / (std + eps)` standardisation. Both policy gradient
/// agents have always trained with this form and it is kept as is until someone decides
/// otherwise.
pub fn normalize_returns(returns: &[f32]) -> Vec<f32> {
    if returns.is_empty() {
        return vec![];
    }
    let n = returns.len() as f32;
    let mean = returns.iter().sum::<f32>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / n;
    let shift = mean / (variance.sqrt() + NORMALIZATION_EPSILON);
    returns.iter().map(|r| r - shift).collect()
}

pub fn discount_and_normalize(rewards: &[f32], gamma: f32) -> Vec<f32> {
    normalize_returns(&discounted_returns(rewards, gamma))
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undiscounted_return_to_go() {
        assert_eq!(discounted_returns(&[1., 1., 1.], 1.), vec![3., 2., 1.]);
    }

    #[test]
    fn discounted_return_to_go() {
        let returns = discounted_returns(&[1., 0., 2.], 0.5);
        assert_eq!(returns, vec![1.5, 1., 2.]);
    }

    #[test]
    fn normalization_subtracts_scaled_mean() {
        // mean 2, population std sqrt(2/3)
        let normalized = normalize_returns(&[3., 2., 1.]);
        let shift = 2. / ((2f32 / 3.).sqrt() + 1e-9);
        for (got, want) in normalized.iter().zip([3. - shift, 2. - shift, 1. - shift]) {
            assert!((got - want).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_episode_has_no_returns() {
        assert!(discount_and_normalize(&[], 0.99).is_empty());
        assert_eq!(mean(&[]), 0.);
    }
}
