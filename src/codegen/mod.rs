pub mod lowering;

pub use lowering::Lowering;
