pub mod distributions;
pub mod init;
pub mod learning_module;
pub mod optimizer;
pub mod q_network;
pub mod sequential;
pub mod tensors;
