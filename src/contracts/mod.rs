// Contracts Module - Public ABIs Only

pub mod erc20_bridge_sampler;

pub use erc20_bridge_sampler::{sampler_function, SAMPLER_ABI};
