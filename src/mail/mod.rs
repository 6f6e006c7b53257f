pub mod decoders;
pub mod extract;
