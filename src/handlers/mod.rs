pub mod health;
pub mod now_playing;
pub mod play;
pub mod stream;
pub mod tracks;
