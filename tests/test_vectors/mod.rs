// Known-answer vectors for the software primitives

pub mod aes_cbc;
pub mod digest;
