//! Staged upload of static geometry into device-local buffers
//!
//! Data is written into upload-visible staging buffers, copied by the GPU
//! into device-local buffers, and the device-local buffers are transitioned
//! with a single batched barrier into their binding states.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::geometry::mesh::{MeshBufferPair, MeshDesc, StagingBuffers, UploadedMesh};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, CommandList, GraphicsDevice, IndexBufferView,
    MemoryResidency, ResourceBarrier, ResourceState, VertexBufferView,
};
use crate::log::LogRegistry;
use crate::{engine_debug, engine_report};

const SOURCE: &str = "flipchain::GeometryUpload";

pub struct GeometryUpload;

impl GeometryUpload {
    /// Record the upload of `desc` into `cmd`
    ///
    /// `cmd` must be open for recording. The returned mesh may be drawn only
    /// by work submitted after `cmd`; the returned staging buffers must stay
    /// alive until that submission has completed on the GPU.
    pub fn upload(
        device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        desc: &MeshDesc,
        log: &LogRegistry,
    ) -> Result<UploadedMesh> {
        Self::validate(desc).map_err(|e| engine_report!(log, SOURCE, e))?;

        let vertex_bytes = desc.vertex_bytes();
        let index_bytes = desc.index_bytes();
        let indexed = desc.index_count > 0;

        let vertex_buffer = Self::create_device_local(device, vertex_bytes, BufferUsage::VERTEX, "mesh.vertex")?;
        let index_buffer = if indexed {
            Some(Self::create_device_local(device, index_bytes, BufferUsage::INDEX, "mesh.index")?)
        } else {
            None
        };

        let mut staging = Vec::with_capacity(2);
        let vertex_staging = Self::create_staging(device, &desc.vertex_data[..vertex_bytes as usize], "mesh.vertex.staging")?;
        cmd.copy_buffer(vertex_staging.as_ref(), vertex_buffer.as_ref(), vertex_bytes)?;
        staging.push(vertex_staging);

        if let (Some(index_buffer), Some(index_data)) = (&index_buffer, desc.index_data) {
            let index_staging = Self::create_staging(device, &index_data[..index_bytes as usize], "mesh.index.staging")?;
            cmd.copy_buffer(index_staging.as_ref(), index_buffer.as_ref(), index_bytes)?;
            staging.push(index_staging);
        }

        let mut barriers = vec![ResourceBarrier::buffer(
            vertex_buffer.as_ref(),
            ResourceState::CopyDestination,
            ResourceState::VertexBuffer,
        )];
        if let Some(index_buffer) = &index_buffer {
            barriers.push(ResourceBarrier::buffer(
                index_buffer.as_ref(),
                ResourceState::CopyDestination,
                ResourceState::IndexBuffer,
            ));
        }
        cmd.resource_barrier(&barriers)?;

        let vertex_view = VertexBufferView {
            buffer: vertex_buffer,
            size: vertex_bytes,
            stride: desc.vertex_stride,
        };
        let index_view = index_buffer.map(|buffer| IndexBufferView {
            buffer,
            size: index_bytes,
            format: desc.index_format,
        });

        engine_debug!(
            log,
            SOURCE,
            "Recorded upload: {} vertices ({} bytes), {} indices ({} bytes)",
            desc.vertex_count,
            vertex_bytes,
            desc.index_count,
            index_bytes
        );

        Ok(UploadedMesh {
            mesh: MeshBufferPair::new(
                vertex_view,
                index_view,
                desc.vertex_count,
                desc.index_count,
                desc.input_layout.clone(),
            ),
            staging: StagingBuffers::new(staging),
        })
    }

    /// Caller contract checks. Stride/layout consistency is not checked.
    fn validate(desc: &MeshDesc) -> Result<()> {
        if desc.vertex_count == 0 {
            return Err(Error::InvalidResource("mesh has no vertices".to_string()));
        }
        if desc.vertex_stride == 0 {
            return Err(Error::InvalidResource("vertex stride is zero".to_string()));
        }
        if (desc.vertex_data.len() as u64) < desc.vertex_bytes() {
            return Err(Error::InvalidResource(format!(
                "vertex data holds {} bytes, {} vertices of stride {} need {}",
                desc.vertex_data.len(),
                desc.vertex_count,
                desc.vertex_stride,
                desc.vertex_bytes()
            )));
        }
        if desc.index_count > 0 {
            if !desc.index_format.is_index_format() {
                return Err(Error::InvalidResource(format!(
                    "{:?} is not an index format",
                    desc.index_format
                )));
            }
            let index_data = desc
                .index_data
                .ok_or_else(|| Error::InvalidResource("index count is set but index data is missing".to_string()))?;
            if (index_data.len() as u64) < desc.index_bytes() {
                return Err(Error::InvalidResource(format!(
                    "index data holds {} bytes, {} indices need {}",
                    index_data.len(),
                    desc.index_count,
                    desc.index_bytes()
                )));
            }
        }
        Ok(())
    }

    fn create_device_local(
        device: &dyn GraphicsDevice,
        size: u64,
        usage: BufferUsage,
        name: &str,
    ) -> Result<Arc<dyn Buffer>> {
        device.create_buffer(&BufferDesc {
            size,
            residency: MemoryResidency::DeviceLocal,
            initial_state: ResourceState::CopyDestination,
            usage: usage | BufferUsage::COPY_DST,
            name: name.to_string(),
        })
    }

    fn create_staging(device: &dyn GraphicsDevice, data: &[u8], name: &str) -> Result<Arc<dyn Buffer>> {
        let buffer = device.create_buffer(&BufferDesc {
            size: data.len() as u64,
            residency: MemoryResidency::UploadVisible,
            initial_state: ResourceState::CopySource,
            usage: BufferUsage::COPY_SRC,
            name: name.to_string(),
        })?;
        buffer.write(0, data)?;
        Ok(buffer)
    }
}

#[cfg(test)]
#[path = "geometry_upload_tests.rs"]
mod tests;
