
use crate::device::DeviceShared;
use crate::mem::{upload_texture_pixels, MemoryAllocation};
use error::EngineError;
use ash::vk;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// DecodedTexture struct
/// Pixels of an image file, converted to tightly packed RGBA8
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>
}

impl DecodedTexture {

    /// Read and decode an image file
    pub fn from_file(path: &Path) -> Result<DecodedTexture, EngineError> {
        let image = image::open(path)
            .map_err(|e| match e {
                image::ImageError::IoError(io_error) => EngineError::from_io(path, io_error),
                other => EngineError::Malformed(format!("{}: {}", path.display(), other))
            })?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(EngineError::Malformed(format!("{}: image is empty", path.display())));
        }
        Ok(DecodedTexture {
            width,
            height,
            pixels: rgba.into_raw()
        })
    }
}

/// VkTexture struct
/// A sampled RGBA8 image, its view and the memory backing it
pub struct VkTexture {
    shared: Rc<DeviceShared>,
    allocation: MemoryAllocation,
    image: vk::Image,
    image_view: vk::ImageView,
    width: u32,
    height: u32,
    path: PathBuf,
    alive: Rc<()>
}

impl VkTexture {

    pub(crate) unsafe fn from_file(shared: &Rc<DeviceShared>, path: &Path) -> Result<VkTexture, EngineError> {
        let decoded = DecodedTexture::from_file(path)?;
        let texture = Self::new(shared, &decoded, path)?;
        log::debug!("Loaded texture {} ({}x{})", path.display(), decoded.width, decoded.height);
        Ok(texture)
    }

    unsafe fn new(
        shared: &Rc<DeviceShared>,
        decoded: &DecodedTexture,
        path: &Path
    ) -> Result<VkTexture, EngineError> {
        let device = &shared.device;
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_UNORM)
            .extent(vk::Extent3D { width: decoded.width, height: decoded.height, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let image = device.create_image(&image_info, None)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error creating image: {:?}", e))
            })?;

        let requirements = device.get_image_memory_requirements(image);
        let allocation = match MemoryAllocation::new(
            device,
            &shared.memory_properties,
            requirements,
            shared.memory_types.device_local,
            vk::MemoryPropertyFlags::DEVICE_LOCAL
        ) {
            Ok(allocation) => allocation,
            Err(e) => {
                device.destroy_image(image, None);
                return Err(e);
            }
        };

        // From here on, dropping the wrapper releases everything created so far
        let mut texture = VkTexture {
            shared: shared.clone(),
            allocation,
            image,
            image_view: vk::ImageView::null(),
            width: decoded.width,
            height: decoded.height,
            path: path.to_path_buf(),
            alive: Rc::new(())
        };
        device.bind_image_memory(image, texture.allocation.memory, 0)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error binding memory to image: {:?}", e))
            })?;
        upload_texture_pixels(shared, image, decoded.width, decoded.height, &decoded.pixels)?;

        let subresource_range = vk::ImageSubresourceRange::builder()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1);
        let image_view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_UNORM)
            .subresource_range(*subresource_range);
        texture.image_view = device
            .create_image_view(&image_view_create_info, None)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error creating image view: {:?}", e))
            })?;

        Ok(texture)
    }

    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle that stops upgrading once this texture is dropped
    pub(crate) fn liveness(&self) -> Weak<()> {
        Rc::downgrade(&self.alive)
    }
}

impl Drop for VkTexture {
    fn drop(&mut self) {
        unsafe {
            if self.image_view != vk::ImageView::null() {
                self.shared.device.destroy_image_view(self.image_view, None);
            }
            self.shared.device.destroy_image(self.image, None);
            self.allocation.free(&self.shared.device);
        }
    }
}
