pub mod assembler;

pub use assembler::WriteAssembler;
