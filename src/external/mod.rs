pub mod spotify;

pub use spotify::{NowPlaying, NowPlayingTrack, SpotifyAdapter};
