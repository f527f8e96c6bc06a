//! Mock graphics device for unit tests
//!
//! Provides a GPU-free implementation of every device trait. Commands are
//! recorded into `MockCommandList`s and executed against simulated memory when
//! submitted (or later, with deferred execution). Execution validates every
//! barrier against the last known state of its resource and every bind/copy
//! against the state it requires, so tests can assert zero violations.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use raw_window_handle::{RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle};

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::graphics_device::{
    BarrierResource, Buffer, BufferDesc, CommandList, CommandQueue, DepthStencilView, DeviceInfo,
    Fence, GraphicsBackend, GraphicsDevice, GraphicsFormat, IndexBufferView, MemoryResidency,
    Pipeline, PipelineDesc, Rect2D, RenderTargetView, RenderingDesc, ResourceBarrier,
    ResourceState, SurfaceHandle, Swapchain, SwapchainDesc, Texture, TextureDesc, TextureFormat,
    VertexBufferView, Viewport,
};
use crate::log::{LogEntry, LogRegistry, LogSeverity, Logger};

// ============================================================================
// Recorded commands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockBarrier {
    pub resource: u64,
    pub before: ResourceState,
    pub after: ResourceState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Reset { with_pipeline: bool },
    SetViewport(Viewport),
    SetScissor(Rect2D),
    Barrier(Vec<MockBarrier>),
    BeginRendering { target: u64, depth: Option<u64>, clear_color: [f32; 4], clear_depth: f32 },
    EndRendering,
    BindPipeline,
    BindVertexBuffer { buffer: u64, size: u64, stride: u32 },
    BindIndexBuffer { buffer: u64, size: u64, format: GraphicsFormat },
    Draw { vertex_count: u32 },
    DrawIndexed { index_count: u32 },
    CopyBuffer { src: u64, dst: u64, size: u64 },
}

enum PendingWork {
    Commands(Vec<MockCommand>),
    Signal { fence: u64, value: u64 },
}

// ============================================================================
// Shared simulated GPU
// ============================================================================

/// Simulated GPU state shared by every mock object
#[derive(Default)]
pub struct MockGpuState {
    next_id: u64,
    memory: HashMap<u64, Vec<u8>>,
    states: HashMap<u64, ResourceState>,
    fences: HashMap<u64, u64>,
    pending: VecDeque<PendingWork>,
    fail_on: Vec<&'static str>,
    device_lost: bool,
    acquire_script: VecDeque<u32>,

    /// When true, submitted work waits for `MockGpu::execute_pending`
    pub deferred_execution: bool,
    /// Index returned by the first acquire
    pub swapchain_start_index: u32,
    /// Largest supported swapchain buffer count
    pub max_buffer_count: u32,

    /// Barrier/bind/copy state mismatches found during execution
    pub violations: Vec<String>,
    /// Every command executed, in order
    pub executed: Vec<MockCommand>,
    /// Executed draws only
    pub draws: Vec<MockCommand>,
    /// Presented image indices
    pub presents: Vec<u32>,
    /// Descriptors of every buffer created, with its id
    pub created_buffers: Vec<(u64, BufferDesc)>,
    pub submissions: u32,

    pub live_buffers: usize,
    pub live_textures: usize,
    pub live_views: usize,
    pub live_command_lists: usize,
    pub live_pipelines: usize,
    pub live_swapchains: usize,
}

impl MockGpuState {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&mut self, operation: &'static str) -> Result<()> {
        if self.device_lost {
            return Err(Error::DeviceLost { operation });
        }
        if let Some(pos) = self.fail_on.iter().position(|op| *op == operation) {
            self.fail_on.remove(pos);
            return Err(Error::OperationFailed { operation, code: -1 });
        }
        Ok(())
    }

    fn expect_state(&mut self, resource: u64, expected: ResourceState, what: &str) {
        let current = self.states.get(&resource).copied();
        if current != Some(expected) {
            self.violations.push(format!(
                "{} on resource {} requires {:?}, found {:?}",
                what, resource, expected, current
            ));
        }
    }

    fn execute(&mut self, commands: Vec<MockCommand>) {
        for command in commands {
            match &command {
                MockCommand::Barrier(barriers) => {
                    for barrier in barriers {
                        let current = self.states.get(&barrier.resource).copied();
                        if current != Some(barrier.before) {
                            self.violations.push(format!(
                                "barrier on resource {} expects {:?}, found {:?}",
                                barrier.resource, barrier.before, current
                            ));
                        }
                        self.states.insert(barrier.resource, barrier.after);
                    }
                }
                MockCommand::CopyBuffer { src, dst, size } => {
                    self.expect_state(*src, ResourceState::CopySource, "copy source");
                    self.expect_state(*dst, ResourceState::CopyDestination, "copy destination");
                    let size = *size as usize;
                    let data = self.memory.get(src).map(|m| m[..size].to_vec());
                    if let (Some(data), Some(target)) = (data, self.memory.get_mut(dst)) {
                        target[..size].copy_from_slice(&data);
                    }
                }
                MockCommand::BindVertexBuffer { buffer, .. } => {
                    self.expect_state(*buffer, ResourceState::VertexBuffer, "vertex bind");
                }
                MockCommand::BindIndexBuffer { buffer, .. } => {
                    self.expect_state(*buffer, ResourceState::IndexBuffer, "index bind");
                }
                MockCommand::BeginRendering { target, depth, .. } => {
                    self.expect_state(*target, ResourceState::RenderTarget, "color attachment");
                    if let Some(depth) = depth {
                        self.expect_state(*depth, ResourceState::DepthWrite, "depth attachment");
                    }
                }
                MockCommand::Draw { .. } | MockCommand::DrawIndexed { .. } => {
                    self.draws.push(command.clone());
                }
                _ => {}
            }
            self.executed.push(command);
        }
    }

    fn run_pending(&mut self) {
        while let Some(work) = self.pending.pop_front() {
            match work {
                PendingWork::Commands(commands) => self.execute(commands),
                PendingWork::Signal { fence, value } => {
                    let current = self.fences.entry(fence).or_insert(0);
                    *current = (*current).max(value);
                }
            }
        }
    }
}

/// Simulated GPU
pub struct MockGpu {
    state: Mutex<MockGpuState>,
    fence_cv: Condvar,
}

impl MockGpu {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockGpuState {
                max_buffer_count: 3,
                ..Default::default()
            }),
            fence_cv: Condvar::new(),
        })
    }

    /// Lock the simulated state for inspection
    pub fn state(&self) -> MutexGuard<'_, MockGpuState> {
        self.state.lock().unwrap()
    }

    /// Make the next call to `operation` fail with a native code of -1
    pub fn fail_on(&self, operation: &'static str) {
        self.state().fail_on.push(operation);
    }

    /// Make every later GPU call report device removal
    pub fn lose_device(&self) {
        self.state().device_lost = true;
    }

    pub fn set_deferred_execution(&self, deferred: bool) {
        self.state().deferred_execution = deferred;
    }

    /// Force the sequence of indices returned by acquire
    pub fn script_acquire(&self, indices: &[u32]) {
        self.state().acquire_script.extend(indices.iter().copied());
    }

    /// Execute all queued work and wake fence waiters
    pub fn execute_pending(&self) {
        self.state().run_pending();
        self.fence_cv.notify_all();
    }

    pub fn resource_state(&self, id: u64) -> Option<ResourceState> {
        self.state().states.get(&id).copied()
    }

    pub fn violations(&self) -> Vec<String> {
        self.state().violations.clone()
    }

    /// Ids of buffers created with the given residency
    pub fn buffer_ids(&self, residency: MemoryResidency) -> Vec<u64> {
        self.state()
            .created_buffers
            .iter()
            .filter(|(_, desc)| desc.residency == residency)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn buffer_contents(&self, id: u64) -> Option<Vec<u8>> {
        self.state().memory.get(&id).cloned()
    }

    fn enqueue(&self, work: PendingWork) {
        let mut state = self.state();
        state.pending.push_back(work);
        if !state.deferred_execution {
            state.run_pending();
            drop(state);
            self.fence_cv.notify_all();
        }
    }
}

// ============================================================================
// Downcasts (every object reaching the mock was created by it)
// ============================================================================

pub fn mock_buffer(buffer: &dyn Buffer) -> &MockBuffer {
    unsafe { &*(buffer as *const dyn Buffer as *const MockBuffer) }
}

pub fn mock_texture(texture: &dyn Texture) -> &MockTexture {
    unsafe { &*(texture as *const dyn Texture as *const MockTexture) }
}

pub fn mock_command_list(list: &dyn CommandList) -> &MockCommandList {
    unsafe { &*(list as *const dyn CommandList as *const MockCommandList) }
}

// ============================================================================
// Resources
// ============================================================================

pub struct MockBuffer {
    pub id: u64,
    pub size: u64,
    pub residency: MemoryResidency,
    gpu: Arc<MockGpu>,
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn residency(&self) -> MemoryResidency {
        self.residency
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.residency.is_cpu_visible() {
            return Err(Error::BackendError("Buffer is not CPU-accessible".to_string()));
        }
        let end = offset as usize + data.len();
        if end as u64 > self.size {
            return Err(Error::BackendError(format!("write of {} bytes overflows buffer", data.len())));
        }
        let mut state = self.gpu.state();
        if let Some(memory) = state.memory.get_mut(&self.id) {
            memory[offset as usize..end].copy_from_slice(data);
        }
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        if !self.residency.is_cpu_visible() {
            return Err(Error::BackendError("Buffer is not CPU-accessible".to_string()));
        }
        if offset + len > self.size {
            return Err(Error::BackendError(format!("read of {} bytes overflows buffer", len)));
        }
        let state = self.gpu.state();
        Ok(state
            .memory
            .get(&self.id)
            .map(|m| m[offset as usize..(offset + len) as usize].to_vec())
            .unwrap_or_default())
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        let mut state = self.gpu.state();
        state.memory.remove(&self.id);
        state.states.remove(&self.id);
        state.live_buffers -= 1;
    }
}

pub struct MockTexture {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    gpu: Arc<MockGpu>,
}

impl MockTexture {
    fn new(gpu: &Arc<MockGpu>, width: u32, height: u32, format: TextureFormat, state: ResourceState) -> Self {
        let mut guard = gpu.state();
        let id = guard.alloc_id();
        guard.states.insert(id, state);
        guard.live_textures += 1;
        drop(guard);
        Self { id, width, height, format, gpu: Arc::clone(gpu) }
    }
}

impl Texture for MockTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        let mut state = self.gpu.state();
        state.states.remove(&self.id);
        state.live_textures -= 1;
    }
}

pub struct MockView {
    texture: Arc<dyn Texture>,
    gpu: Arc<MockGpu>,
}

impl MockView {
    fn new(gpu: &Arc<MockGpu>, texture: &Arc<dyn Texture>) -> Self {
        gpu.state().live_views += 1;
        Self { texture: Arc::clone(texture), gpu: Arc::clone(gpu) }
    }
}

impl RenderTargetView for MockView {
    fn texture(&self) -> &dyn Texture {
        self.texture.as_ref()
    }
}

impl DepthStencilView for MockView {
    fn texture(&self) -> &dyn Texture {
        self.texture.as_ref()
    }
}

impl Drop for MockView {
    fn drop(&mut self) {
        self.gpu.state().live_views -= 1;
    }
}

pub struct MockPipeline {
    pub stride: u32,
    gpu: Arc<MockGpu>,
}

impl Pipeline for MockPipeline {
    fn vertex_stride(&self) -> u32 {
        self.stride
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        self.gpu.state().live_pipelines -= 1;
    }
}

// ============================================================================
// Fence / queue
// ============================================================================

pub struct MockFence {
    pub id: u64,
    gpu: Arc<MockGpu>,
}

impl Fence for MockFence {
    fn completed_value(&self) -> Result<u64> {
        let mut state = self.gpu.state();
        state.check("completed_value")?;
        Ok(state.fences.get(&self.id).copied().unwrap_or(0))
    }

    fn wait(&self, value: u64, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.gpu.state();
        loop {
            state.check("wait")?;
            if state.fences.get(&self.id).copied().unwrap_or(0) >= value {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            state = self.gpu.fence_cv.wait_timeout(state, deadline - now).unwrap().0;
        }
    }
}

pub struct MockQueue {
    gpu: Arc<MockGpu>,
}

impl MockQueue {
    fn collect(&self, lists: &[&dyn CommandList]) -> Result<Vec<MockCommand>> {
        let mut commands = Vec::new();
        for list in lists {
            let list = mock_command_list(*list);
            if list.recording {
                return Err(Error::InvalidState("submitting a command list that is still open".to_string()));
            }
            commands.extend(list.commands.iter().cloned());
        }
        Ok(commands)
    }
}

impl CommandQueue for MockQueue {
    fn submit(&self, lists: &[&dyn CommandList]) -> Result<()> {
        self.gpu.state().check("submit")?;
        let commands = self.collect(lists)?;
        self.gpu.state().submissions += 1;
        self.gpu.enqueue(PendingWork::Commands(commands));
        Ok(())
    }

    fn submit_for_present(&self, lists: &[&dyn CommandList], _swapchain: &dyn Swapchain) -> Result<()> {
        self.submit(lists)
    }

    fn signal(&self, fence: &dyn Fence, value: u64) -> Result<()> {
        self.gpu.state().check("signal")?;
        let fence = unsafe { &*(fence as *const dyn Fence as *const MockFence) };
        self.gpu.enqueue(PendingWork::Signal { fence: fence.id, value });
        Ok(())
    }
}

// ============================================================================
// Command list
// ============================================================================

pub struct MockCommandList {
    pub commands: Vec<MockCommand>,
    recording: bool,
    gpu: Arc<MockGpu>,
}

impl MockCommandList {
    fn record(&mut self, command: MockCommand) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidState("command list is closed".to_string()));
        }
        self.commands.push(command);
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn reset(&mut self, pipeline: Option<&dyn Pipeline>) -> Result<()> {
        if self.recording {
            return Err(Error::InvalidState("command list is already recording".to_string()));
        }
        self.gpu.state().check("reset")?;
        self.commands.clear();
        self.recording = true;
        self.record(MockCommand::Reset { with_pipeline: pipeline.is_some() })
    }

    fn close(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidState("command list is not recording".to_string()));
        }
        self.gpu.state().check("close")?;
        self.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.record(MockCommand::SetViewport(*viewport))
    }

    fn set_scissor(&mut self, scissor: &Rect2D) -> Result<()> {
        self.record(MockCommand::SetScissor(*scissor))
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) -> Result<()> {
        let barriers = barriers
            .iter()
            .map(|b| MockBarrier {
                resource: match b.resource {
                    BarrierResource::Buffer(buffer) => mock_buffer(buffer).id,
                    BarrierResource::Texture(texture) => mock_texture(texture).id,
                },
                before: b.before,
                after: b.after,
            })
            .collect();
        self.record(MockCommand::Barrier(barriers))
    }

    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()> {
        self.record(MockCommand::BeginRendering {
            target: mock_texture(desc.color.texture()).id,
            depth: desc.depth.map(|d| mock_texture(d.texture()).id),
            clear_color: desc.clear_color,
            clear_depth: desc.clear_depth,
        })
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.record(MockCommand::EndRendering)
    }

    fn bind_pipeline(&mut self, _pipeline: &dyn Pipeline) -> Result<()> {
        self.record(MockCommand::BindPipeline)
    }

    fn bind_vertex_buffer(&mut self, view: &VertexBufferView) -> Result<()> {
        self.record(MockCommand::BindVertexBuffer {
            buffer: mock_buffer(view.buffer.as_ref()).id,
            size: view.size,
            stride: view.stride,
        })
    }

    fn bind_index_buffer(&mut self, view: &IndexBufferView) -> Result<()> {
        self.record(MockCommand::BindIndexBuffer {
            buffer: mock_buffer(view.buffer.as_ref()).id,
            size: view.size,
            format: view.format,
        })
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.record(MockCommand::Draw { vertex_count })
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.record(MockCommand::DrawIndexed { index_count })
    }

    fn copy_buffer(&mut self, src: &dyn Buffer, dst: &dyn Buffer, size: u64) -> Result<()> {
        self.record(MockCommand::CopyBuffer {
            src: mock_buffer(src).id,
            dst: mock_buffer(dst).id,
            size,
        })
    }
}

impl Drop for MockCommandList {
    fn drop(&mut self) {
        self.gpu.state().live_command_lists -= 1;
    }
}

// ============================================================================
// Swapchain
// ============================================================================

pub struct MockSwapchain {
    images: Vec<Arc<dyn Texture>>,
    current: Option<u32>,
    width: u32,
    height: u32,
    format: TextureFormat,
    gpu: Arc<MockGpu>,
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self) -> Result<u32> {
        let mut state = self.gpu.state();
        state.check("acquire")?;
        let count = self.images.len() as u32;
        let next = match (state.acquire_script.pop_front(), self.current) {
            (Some(scripted), _) => scripted,
            (None, None) => state.swapchain_start_index % count,
            (None, Some(current)) => (current + 1) % count,
        };
        self.current = Some(next);
        Ok(next)
    }

    fn present(&mut self, image_index: u32) -> Result<()> {
        let mut state = self.gpu.state();
        state.check("present")?;
        if !state.deferred_execution {
            let id = mock_texture(self.images[image_index as usize].as_ref()).id;
            state.expect_state(id, ResourceState::Present, "present");
        }
        state.presents.push(image_index);
        Ok(())
    }

    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn image(&self, index: u32) -> Option<Arc<dyn Texture>> {
        self.images.get(index as usize).cloned()
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for MockSwapchain {
    fn drop(&mut self) {
        self.gpu.state().live_swapchains -= 1;
    }
}

// ============================================================================
// Device / backend
// ============================================================================

pub struct MockGraphicsDevice {
    gpu: Arc<MockGpu>,
    queue: Arc<MockQueue>,
}

impl MockGraphicsDevice {
    pub fn new(gpu: &Arc<MockGpu>) -> Self {
        Self {
            gpu: Arc::clone(gpu),
            queue: Arc::new(MockQueue { gpu: Arc::clone(gpu) }),
        }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo { backend: "mock", adapter_name: "Mock GPU".to_string() }
    }

    fn direct_queue(&self) -> Arc<dyn CommandQueue> {
        self.queue.clone()
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        let mut state = self.gpu.state();
        state.check("create_command_list")?;
        state.live_command_lists += 1;
        Ok(Box::new(MockCommandList {
            commands: Vec::new(),
            recording: false,
            gpu: Arc::clone(&self.gpu),
        }))
    }

    fn create_fence(&self, initial_value: u64) -> Result<Arc<dyn Fence>> {
        let mut state = self.gpu.state();
        state.check("create_fence")?;
        let id = state.alloc_id();
        state.fences.insert(id, initial_value);
        Ok(Arc::new(MockFence { id, gpu: Arc::clone(&self.gpu) }))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        let mut state = self.gpu.state();
        state.check("create_buffer")?;
        let id = state.alloc_id();
        state.memory.insert(id, vec![0; desc.size as usize]);
        state.states.insert(id, desc.initial_state);
        state.created_buffers.push((id, desc.clone()));
        state.live_buffers += 1;
        Ok(Arc::new(MockBuffer {
            id,
            size: desc.size,
            residency: desc.residency,
            gpu: Arc::clone(&self.gpu),
        }))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        self.gpu.state().check("create_texture")?;
        Ok(Arc::new(MockTexture::new(&self.gpu, desc.width, desc.height, desc.format, desc.initial_state)))
    }

    fn create_swapchain(&self, _surface: &SurfaceHandle, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>> {
        {
            let mut state = self.gpu.state();
            state.check("create_swapchain")?;
            if desc.buffer_count == 0 || desc.buffer_count > state.max_buffer_count {
                return Err(Error::OperationFailed { operation: "create_swapchain", code: -2 });
            }
            state.live_swapchains += 1;
        }
        let images = (0..desc.buffer_count)
            .map(|_| {
                Arc::new(MockTexture::new(&self.gpu, desc.width, desc.height, desc.format, ResourceState::Present))
                    as Arc<dyn Texture>
            })
            .collect();
        Ok(Box::new(MockSwapchain {
            images,
            current: None,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            gpu: Arc::clone(&self.gpu),
        }))
    }

    fn create_render_target_view(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTargetView>> {
        self.gpu.state().check("create_render_target_view")?;
        Ok(Arc::new(MockView::new(&self.gpu, texture)))
    }

    fn create_depth_stencil_view(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn DepthStencilView>> {
        self.gpu.state().check("create_depth_stencil_view")?;
        Ok(Arc::new(MockView::new(&self.gpu, texture)))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        let mut state = self.gpu.state();
        state.check("create_pipeline")?;
        for code in [&desc.vertex_shader, &desc.fragment_shader] {
            if code.is_empty() || code.len() % 4 != 0 {
                return Err(Error::BackendError("malformed shader bytecode".to_string()));
            }
        }
        state.live_pipelines += 1;
        Ok(Arc::new(MockPipeline {
            stride: desc.vertex_layout.stride,
            gpu: Arc::clone(&self.gpu),
        }))
    }

    /// Blocks like a real device: all queued work runs before this returns
    fn wait_idle(&self) -> Result<()> {
        self.gpu.state().check("wait_idle")?;
        self.gpu.execute_pending();
        Ok(())
    }
}

pub struct MockBackend {
    pub gpu: Arc<MockGpu>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self { gpu: MockGpu::new() }
    }
}

impl GraphicsBackend for MockBackend {
    fn create_device(
        &self,
        _surface: &SurfaceHandle,
        _config: &RendererConfig,
        _log: &LogRegistry,
    ) -> Result<Arc<dyn GraphicsDevice>> {
        self.gpu.state().check("create_device")?;
        Ok(Arc::new(MockGraphicsDevice::new(&self.gpu)))
    }
}

// ============================================================================
// Test helpers
// ============================================================================

/// Surface handle that no backend will ever dereference
pub fn test_surface() -> SurfaceHandle {
    SurfaceHandle {
        window: RawWindowHandle::Web(WebWindowHandle::new(1)),
        display: RawDisplayHandle::Web(WebDisplayHandle::new()),
    }
}

/// Write two small, well-formed shader blobs and return a config pointing at them
pub fn test_config(tag: &str) -> RendererConfig {
    let dir = std::env::temp_dir().join(format!("flipchain_{}_{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let vertex: PathBuf = dir.join("vertex.spv");
    let fragment: PathBuf = dir.join("fragment.spv");
    std::fs::write(&vertex, 0x0723_0203u32.to_le_bytes().repeat(4)).unwrap();
    std::fs::write(&fragment, 0x0723_0203u32.to_le_bytes().repeat(4)).unwrap();
    RendererConfig {
        vertex_shader_path: vertex,
        fragment_shader_path: fragment,
        fence_timeout: Duration::from_millis(200),
        ..RendererConfig::default()
    }
}

/// Log sink keeping every entry in memory
#[derive(Default)]
pub struct CapturingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl CapturingLogger {
    /// Create a silent registry with a capturing sink attached
    pub fn registry() -> (LogRegistry, Arc<CapturingLogger>) {
        let log = LogRegistry::silent();
        let sink = Arc::new(CapturingLogger::default());
        log.add_sink(sink.clone());
        (log, sink)
    }

    pub fn messages(&self, severity: LogSeverity) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.severity == severity)
            .map(|e| e.message.clone())
            .collect()
    }
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
