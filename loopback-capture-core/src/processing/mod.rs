pub mod accumulator;
pub mod duration_gate;
pub mod wav_format;
