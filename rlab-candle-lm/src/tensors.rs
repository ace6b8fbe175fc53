use candle_core::{Device, Result, Tensor};
use derive_more::{Deref, DerefMut, Display};

#[derive(Deref, DerefMut, Debug, Display)]
pub struct PolicyLoss(pub Tensor);

#[derive(Deref, DerefMut, Debug, Display)]
pub struct ValueLoss(pub Tensor);

#[derive(Deref, DerefMut, Debug, Display)]
pub struct QLoss(pub Tensor);

#[derive(Deref, DerefMut, Debug, Display)]
pub struct Logp(pub Tensor);

#[derive(Deref, DerefMut, Debug, Display)]
pub struct Returns(pub Tensor);

/// Stacks equally sized observations into a `(batch, width)` tensor.
pub fn observation_batch<O: AsRef<[f32]>>(observations: &[O], device: &Device) -> Result<Tensor> {
    let width = observations.first().map_or(0, |o| o.as_ref().len());
    let flat: Vec<f32> = observations
        .iter()
        .flat_map(|o| o.as_ref().iter().copied())
        .collect();
    Tensor::from_vec(flat, (observations.len(), width), device)
}

pub fn action_batch(actions: &[usize], device: &Device) -> Result<Tensor> {
    let actions: Vec<u32> = actions.iter().map(|a| *a as u32).collect();
    let len = actions.len();
    Tensor::from_vec(actions, len, device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_are_row_major() -> Result<()> {
        let batch = observation_batch(&[vec![1f32, 2.], vec![3., 4.]], &Device::Cpu)?;
        assert_eq!(batch.dims(), &[2, 2]);
        assert_eq!(batch.to_vec2::<f32>()?, vec![vec![1., 2.], vec![3., 4.]]);
        Ok(())
    }
}
