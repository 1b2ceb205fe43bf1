pub mod track;

pub use track::{
    ActiveModel as TrackActiveModel, Column as TrackColumn, Entity as TrackEntity,
    Model as TrackModel, PlayRequestDto, PlayResponseDto, TrackListItemDto, TrackStatus,
    TrackTags,
};
