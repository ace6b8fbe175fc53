use candle_core::{Result, Tensor, Var, backprop::GradStore};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, SGD};
use std::fmt::Debug;

pub enum OptimizerKind {
    Sgd(SGD),
    /// Plain Adam: AdamW without weight decay.
    Adam(AdamW),
}

impl Debug for OptimizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Sgd(_) => "Sgd",
            Self::Adam(_) => "Adam",
        };
        f.debug_struct(name)
            .field("learning_rate", &self.learning_rate())
            .finish()
    }
}

impl OptimizerKind {
    pub fn sgd(vars: Vec<Var>, learning_rate: f64) -> Result<Self> {
        Ok(Self::Sgd(SGD::new(vars, learning_rate)?))
    }

    pub fn adam(vars: Vec<Var>, learning_rate: f64) -> Result<Self> {
        let params = ParamsAdamW {
            lr: learning_rate,
            weight_decay: 0.,
            ..Default::default()
        };
        Ok(Self::Adam(AdamW::new(vars, params)?))
    }

    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match self {
            Self::Sgd(sgd) => sgd.step(grads),
            Self::Adam(adam) => adam.step(grads),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            Self::Sgd(sgd) => sgd.learning_rate(),
            Self::Adam(adam) => adam.learning_rate(),
        }
    }
}

/// Backpropagates `loss` and rescales the gradients of `vars` so that their global L2 norm does
/// not exceed `max_norm`.
pub fn clip_grad(loss: &Tensor, vars: &[Var], max_norm: f32) -> Result<GradStore> {
    let mut grad_store = loss.backward()?;
    let mut total_norm_squared = 0.0f32;
    for var in vars.iter() {
        if let Some(grad) = grad_store.get(var.as_tensor()) {
            total_norm_squared += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
        }
    }
    let total_norm = total_norm_squared.sqrt();
    if total_norm > max_norm {
        let clip_coef = max_norm / (total_norm + 1e-6);
        for var in vars.iter() {
            let Some(grad) = grad_store.get(var.as_tensor()) else {
                continue;
            };
            let new_grad = grad.affine(clip_coef as f64, 0.)?;
            grad_store.insert(var.as_tensor(), new_grad);
        }
    }
    Ok(grad_store)
}

/// An optimizer bound to one parameter group, optionally clipping the gradient norm of that group
/// before each step.
pub struct OptimizerWithMaxGrad {
    pub optimizer: OptimizerKind,
    pub max_grad_norm: Option<f32>,
    vars: Vec<Var>,
}

impl Debug for OptimizerWithMaxGrad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerWithMaxGrad")
            .field("optimizer", &self.optimizer)
            .field("max_grad_norm", &self.max_grad_norm)
            .finish()
    }
}

impl OptimizerWithMaxGrad {
    pub fn new(optimizer: OptimizerKind, max_grad_norm: Option<f32>, vars: Vec<Var>) -> Self {
        Self {
            optimizer,
            max_grad_norm,
            vars,
        }
    }

    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = if let Some(max_norm) = self.max_grad_norm {
            clip_grad(loss, &self.vars, max_norm)?
        } else {
            loss.backward()?
        };
        self.optimizer.step(&grads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    fn grad_norm(grads: &GradStore, vars: &[Var]) -> Result<f32> {
        let mut total = 0f32;
        for var in vars {
            if let Some(grad) = grads.get(var.as_tensor()) {
                total += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
            }
        }
        Ok(total.sqrt())
    }

    #[test]
    fn large_gradients_are_scaled_down() -> Result<()> {
        let w = Var::from_slice(&[3f32, 4.], 2, &Device::Cpu)?;
        // d/dw sum(w * 10) = 10 per entry, norm ~ 14.14
        let loss = w.as_tensor().affine(10., 0.)?.sum_all()?;
        let grads = clip_grad(&loss, &[w.clone()], 1.)?;
        assert!((grad_norm(&grads, &[w])? - 1.).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn small_gradients_are_untouched() -> Result<()> {
        let w = Var::zeros(3, DType::F32, &Device::Cpu)?;
        let loss = w.as_tensor().affine(0.1, 0.)?.sum_all()?;
        let grads = clip_grad(&loss, &[w.clone()], 1.)?;
        let norm = grad_norm(&grads, &[w])?;
        assert!((norm - (0.03f32).sqrt()).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn sgd_step_moves_against_the_gradient() -> Result<()> {
        let w = Var::from_slice(&[1f32], 1, &Device::Cpu)?;
        let mut optimizer =
            OptimizerWithMaxGrad::new(OptimizerKind::sgd(vec![w.clone()], 0.5)?, None, vec![]);
        let loss = w.as_tensor().sqr()?.sum_all()?;
        optimizer.backward_step(&loss)?;
        // w - 0.5 * 2w
        assert_eq!(w.as_tensor().to_vec1::<f32>()?, vec![0.]);
        assert_eq!(optimizer.optimizer.learning_rate(), 0.5);
        Ok(())
    }
}
