pub mod reconcile;
pub mod resample;
pub mod silence;
pub mod wav;

// Public API
pub use reconcile::reconcile;
pub use resample::resample_mono16;
pub use silence::silence;
pub use wav::{decode, encode, AudioFormat, DecodedClip, WavError, HEADER_LEN};
