pub mod file_name;
pub mod wav_writer;
