//! Static geometry: mesh descriptions and staged upload to the GPU

pub mod mesh;
pub mod geometry_upload;

pub use mesh::{MeshBufferPair, MeshDesc, MeshHandle, StagingBuffers, UploadedMesh, VertexPC, VertexPNUV};
pub use geometry_upload::GeometryUpload;
