use candle_core::{Result, Tensor};
use candle_nn::{Activation, Linear, Module, VarBuilder, linear};
use either::Either;

#[derive(Debug, Clone)]
pub struct LinearLayer {
    layer: Linear,
    out_dim: usize,
}

impl LinearLayer {
    pub fn new(in_dim: usize, out_dim: usize, vb: &VarBuilder, prefix: &str) -> Result<Self> {
        let layer = linear(in_dim, out_dim, vb.pp(prefix))?;
        Ok(Self { layer, out_dim })
    }

    pub fn out_dim(&self) -> usize {
        self.out_dim
    }
}

impl Module for LinearLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.layer.forward(xs)
    }
}

#[derive(Debug, Clone)]
pub struct ActivationLayer(pub Activation);

impl Module for ActivationLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.0.forward(xs)
    }
}

#[derive(Debug, Clone)]
pub struct Layer(pub Either<LinearLayer, ActivationLayer>);

impl Layer {
    pub fn linear(linear: LinearLayer) -> Self {
        Self(Either::Left(linear))
    }

    pub fn activation(activation: ActivationLayer) -> Self {
        Self(Either::Right(activation))
    }
}

impl Module for Layer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match &self.0 {
            Either::Left(linear) => linear.forward(xs),
            Either::Right(activation) => activation.forward(xs),
        }
    }
}

/// Dense feed-forward stack. Input rows are observations, output rows whatever the last layer
/// produces.
#[derive(Default, Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    output_dim: Option<usize>,
}

impl Module for Sequential {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.layers.iter() {
            xs = layer.forward(&xs)?
        }
        Ok(xs)
    }
}

impl Sequential {
    pub fn add_layer(mut self, layer: Layer) -> Self {
        if let Either::Left(linear) = &layer.0 {
            self.output_dim = Some(linear.out_dim());
        }
        self.layers.push(layer);
        self
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Width of the last dense layer, `None` for an empty stack.
    pub fn output_dim(&self) -> Option<usize> {
        self.output_dim
    }
}

fn build(
    input_dim: usize,
    layers: &[usize],
    vb: &VarBuilder,
    prefix: &str,
    activate_output: bool,
) -> Result<Sequential> {
    let mut last_dim = input_dim;
    let mut nn = Sequential::default();
    let num_layers = layers.len();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_pp = format!("{prefix}{layer_idx}");
        let lin_layer = LinearLayer::new(last_dim, *layer_size, vb, &layer_pp)?;
        nn = nn.add_layer(Layer::linear(lin_layer));
        if activate_output || layer_idx != num_layers - 1 {
            nn = nn.add_layer(Layer::activation(ActivationLayer(Activation::Relu)));
        }
        last_dim = *layer_size;
    }
    Ok(nn)
}

/// ReLU between the layers, linear output. Parameters are named `{prefix}{layer_idx}.weight` and
/// `{prefix}{layer_idx}.bias`.
pub fn build_sequential(
    input_dim: usize,
    layers: &[usize],
    vb: &VarBuilder,
    prefix: &str,
) -> Result<Sequential> {
    build(input_dim, layers, vb, prefix, false)
}

/// Like [`build_sequential`] but every layer, the last one included, is followed by a ReLU.
/// Used for feature extractors that feed further heads.
pub fn build_relu_stack(
    input_dim: usize,
    layers: &[usize],
    vb: &VarBuilder,
    prefix: &str,
) -> Result<Sequential> {
    build(input_dim, layers, vb, prefix, true)
}
