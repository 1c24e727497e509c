
use crate::device::DeviceShared;
use crate::mem::{align_up, MemoryAllocation};
use error::EngineError;
use resource::BufferUsage;
use ash::vk;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Number of versions a uniform buffer starts with
pub const INITIAL_UNIFORM_VERSIONS: usize = 32;

/// Most versions a uniform buffer may grow to before writes are refused
pub const MAX_UNIFORM_VERSIONS: usize = 4096;

/// VersionRing struct
/// Bookkeeping for the versions of a uniform buffer. Each write moves to a fresh version so that
/// draws already recorded keep reading what they were recorded with. A version that stopped
/// being current during pass N may be written again once pass N + frames_in_flight has begun,
/// at which point the GPU has finished every pass that could have read it.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionRing {
    retired_in: Vec<Option<u64>>,
    current: usize
}

impl VersionRing {

    pub fn new(versions: usize) -> VersionRing {
        VersionRing {
            retired_in: vec![None; versions.max(1)],
            current: 0
        }
    }

    pub fn len(&self) -> usize {
        self.retired_in.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retired_in.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// The next version after the current one that no pass still in flight can read
    pub fn find_free(&self, pass_serial: u64, frames_in_flight: u64) -> Option<usize> {
        let count = self.retired_in.len();
        (1..count)
            .map(|step| (self.current + step) % count)
            .find(|index| match self.retired_in[*index] {
                None => true,
                Some(retired) => retired + frames_in_flight <= pass_serial
            })
    }

    /// Make `next` current, retiring the old current version in the given pass
    pub fn advance(&mut self, next: usize, pass_serial: u64) {
        self.retired_in[self.current] = Some(pass_serial);
        self.retired_in[next] = None;
        self.current = next;
    }

    /// Append never-used versions, returning the index of the first one
    pub fn grow(&mut self, extra: usize) -> usize {
        let first = self.retired_in.len();
        self.retired_in.resize(first + extra, None);
        first
    }
}

/// BufferBlock struct
/// One Vulkan buffer and the host-visible memory backing it, holding a run of versions
struct BufferBlock {
    buffer: vk::Buffer,
    allocation: MemoryAllocation
}

#[derive(Copy, Clone, Debug)]
struct VersionLocation {
    block: usize,
    offset: vk::DeviceSize
}

/// VkBuffer struct
/// A buffer in host-visible memory. Vertex buffers have a single version; uniform buffers keep
/// several, spread over one or more blocks, one of which is current.
pub struct VkBuffer {
    shared: Rc<DeviceShared>,
    usage: BufferUsage,
    usage_flags: vk::BufferUsageFlags,
    size_bytes: usize,
    version_stride: vk::DeviceSize,
    blocks: RefCell<Vec<BufferBlock>>,
    locations: RefCell<Vec<VersionLocation>>,
    ring: RefCell<VersionRing>,
    alive: Rc<()>
}

impl VkBuffer {

    pub(crate) unsafe fn new(
        shared: &Rc<DeviceShared>,
        usage: BufferUsage,
        size_bytes: usize,
        init_data: Option<&[u8]>
    ) -> Result<VkBuffer, EngineError> {
        if size_bytes == 0 {
            return Err(EngineError::OpFailed(String::from("Error creating buffer: size is zero")));
        }
        if let Some(data) = init_data {
            if data.len() > size_bytes {
                return Err(EngineError::OpFailed(format!(
                    "Initial data of {} bytes does not fit buffer of {} bytes",
                    data.len(),
                    size_bytes)));
            }
        }

        let (usage_flags, versions) = match usage {
            BufferUsage::InitialiseOnceVertexBuffer => (vk::BufferUsageFlags::VERTEX_BUFFER, 1),
            BufferUsage::UniformBuffer => (vk::BufferUsageFlags::UNIFORM_BUFFER, INITIAL_UNIFORM_VERSIONS)
        };
        let version_stride = align_up(size_bytes as u64, shared.uniform_alignment);
        let block = Self::create_block(shared, usage_flags, version_stride * versions as u64)?;

        // From here on, dropping the wrapper releases every block
        let wrapper = VkBuffer {
            shared: shared.clone(),
            usage,
            usage_flags,
            size_bytes,
            version_stride,
            blocks: RefCell::new(vec![block]),
            locations: RefCell::new(Self::block_locations(0, versions, version_stride)),
            ring: RefCell::new(VersionRing::new(versions)),
            alive: Rc::new(())
        };
        let init = init_data.unwrap_or(&[]);
        wrapper.write_version(0, init)?;

        log::debug!("Created {:?} of {} bytes", usage, size_bytes);
        Ok(wrapper)
    }

    unsafe fn create_block(
        shared: &DeviceShared,
        usage_flags: vk::BufferUsageFlags,
        total_size: vk::DeviceSize
    ) -> Result<BufferBlock, EngineError> {
        let device = &shared.device;
        let buffer_create_info = vk::BufferCreateInfo::builder()
            .size(total_size)
            .usage(usage_flags)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = device.create_buffer(&buffer_create_info, None)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error creating buffer: {:?}", e))
            })?;

        let requirements = device.get_buffer_memory_requirements(buffer);
        let allocation = match MemoryAllocation::new(
            device,
            &shared.memory_properties,
            requirements,
            shared.memory_types.host_visible,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
        ) {
            Ok(allocation) => allocation,
            Err(e) => {
                device.destroy_buffer(buffer, None);
                return Err(e);
            }
        };
        if let Err(e) = device.bind_buffer_memory(buffer, allocation.memory, 0) {
            device.destroy_buffer(buffer, None);
            allocation.free(device);
            return Err(EngineError::OpFailed(format!("Error binding memory to buffer: {:?}", e)));
        }
        Ok(BufferBlock { buffer, allocation })
    }

    fn block_locations(block: usize, versions: usize, stride: vk::DeviceSize) -> Vec<VersionLocation> {
        (0..versions)
            .map(|version| VersionLocation { block, offset: version as u64 * stride })
            .collect()
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Number of versions currently allocated
    pub fn version_count(&self) -> usize {
        self.ring.borrow().len()
    }

    /// Buffer and byte offset of the version currently holding the contents
    pub fn current_binding(&self) -> (vk::Buffer, vk::DeviceSize) {
        let location = self.locations.borrow()[self.ring.borrow().current()];
        (self.blocks.borrow()[location.block].buffer, location.offset)
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.current_binding().0
    }

    pub fn current_offset(&self) -> vk::DeviceSize {
        self.current_binding().1
    }

    /// Handle that stops upgrading once this buffer is dropped
    pub(crate) fn liveness(&self) -> Weak<()> {
        Rc::downgrade(&self.alive)
    }

    /// Replace the contents by writing a version no pass in flight can read and making it
    /// current. The buffer grows when every version is still in use.
    pub(crate) unsafe fn write_discard(&self, data: &[u8]) -> Result<(), EngineError> {
        if self.usage != BufferUsage::UniformBuffer {
            return Err(EngineError::OpFailed(format!(
                "{:?} is not writable after creation", self.usage)));
        }
        if data.len() > self.size_bytes {
            return Err(EngineError::OpFailed(format!(
                "Writing {} bytes to buffer of {} bytes", data.len(), self.size_bytes)));
        }
        let pass_serial = self.shared.pass_serial();
        let free = self.ring.borrow().find_free(pass_serial, self.shared.frames_in_flight);
        let next = match free {
            Some(version) => version,
            None => self.grow()?
        };
        self.write_version(next, data)?;
        self.ring.borrow_mut().advance(next, pass_serial);
        Ok(())
    }

    unsafe fn write_version(&self, version: usize, data: &[u8]) -> Result<(), EngineError> {
        let location = self.locations.borrow()[version];
        let blocks = self.blocks.borrow();
        blocks[location.block].allocation.write(
            &self.shared.device,
            location.offset,
            self.size_bytes as u64,
            data)
    }

    /// Double the number of versions with a new block, up to MAX_UNIFORM_VERSIONS
    unsafe fn grow(&self) -> Result<usize, EngineError> {
        let count = self.ring.borrow().len();
        let extra = count.min(MAX_UNIFORM_VERSIONS.saturating_sub(count));
        if extra == 0 {
            return Err(EngineError::OpFailed(format!(
                "All {} versions of a uniform buffer are still in use by the GPU", count)));
        }
        let block = Self::create_block(
            &self.shared,
            self.usage_flags,
            self.version_stride * extra as u64)?;
        let mut blocks = self.blocks.borrow_mut();
        blocks.push(block);
        self.locations.borrow_mut()
            .extend(Self::block_locations(blocks.len() - 1, extra, self.version_stride));
        log::debug!("Uniform buffer grew from {} to {} versions", count, count + extra);
        Ok(self.ring.borrow_mut().grow(extra))
    }
}

impl Drop for VkBuffer {
    fn drop(&mut self) {
        unsafe {
            for block in self.blocks.borrow().iter() {
                self.shared.device.destroy_buffer(block.buffer, None);
                block.allocation.free(&self.shared.device);
            }
        }
    }
}
