//! 可插拔的抽象层

mod artifact_serializer;

pub use artifact_serializer::{ArtifactSerializer, CsvArtifactSerializer};
