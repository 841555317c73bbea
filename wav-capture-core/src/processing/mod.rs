pub mod amplitude;
pub mod wav_format;
pub mod waveform_buffer;
