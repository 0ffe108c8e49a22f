pub mod analyser;
pub mod analysis;
pub mod bands;
pub mod beat;
pub mod decode;
pub mod features;
#[cfg(feature = "mic")]
pub mod mic;
pub mod source;
