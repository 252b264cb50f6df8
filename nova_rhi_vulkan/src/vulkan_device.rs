/// VulkanDevice - Vulkan implementation of the Device trait
///
/// Sole authority for creating and de-duplicating GPU objects for one
/// backend instance. Owns the instance/device/queues, the gpu-allocator,
/// the hash-keyed object caches and the staging allocator.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::mem::ManuallyDrop;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use nova_rhi::nova::rhi::{
    Buffer as RhiBuffer, BufferDesc, CommandBuffer as RhiCommandBuffer, CommandBufferKind,
    Device as RhiDevice, FrameBuffer as RhiFrameBuffer, FrameBufferDesc,
    GraphicsPipeline as RhiGraphicsPipeline, GraphicsPipelineDesc, GuardedCache,
    Image as RhiImage, ImageDesc, ImageUsage, InputLayout as RhiInputLayout, InputLayoutDesc,
    QueueKind, RecordState, RendererConfig, Sampler as RhiSampler, SamplerDesc,
    Shader as RhiShader, ShaderDesc, StagingAllocator,
};
use nova_rhi::nova::rhi::ContentHash;
use nova_rhi::nova::{Error, Result};
use nova_rhi::{rhi_bail, rhi_debug, rhi_err, rhi_error, rhi_info};

use crate::debug;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_buffer::CommandBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_convert as convert;
use crate::vulkan_framebuffer::FrameBuffer;
use crate::vulkan_image::Image;
use crate::vulkan_input_layout::InputLayout;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_sampler::Sampler;
use crate::vulkan_shader::Shader;

/// Vulkan device implementation
///
/// Central object for creating resources and submitting commands.
/// Completely separated from swapchain and presentation logic.
pub struct VulkanDevice {
    /// Vulkan entry (needed for swapchain surface creation)
    pub(crate) entry: ash::Entry,
    /// Vulkan instance
    pub(crate) instance: ash::Instance,
    /// Physical device
    pub(crate) physical_device: vk::PhysicalDevice,
    /// Logical device (the authoritative copy lives in GpuContext)
    pub(crate) device: ash::Device,

    /// Graphics queue family index (command pools allocate from it, so the
    /// transfer/compute queues are extra queues of the same family)
    pub(crate) graphics_family: u32,
    /// Present-capable family (None for headless devices)
    pub(crate) present_family: Option<u32>,

    /// Extra queues of the graphics family, guarded: vkQueueSubmit requires
    /// external synchronization. None when the family exposes a single
    /// queue; submissions then share the graphics queue.
    transfer_queue: Option<Mutex<vk::Queue>>,
    compute_queue: Option<Mutex<vk::Queue>>,
    pub(crate) present_queue: Option<vk::Queue>,

    /// GPU memory allocator reference (the context holds another)
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Object caches, one mutex per cache
    sampler_cache: GuardedCache<dyn RhiSampler>,
    input_layout_cache: GuardedCache<dyn RhiInputLayout>,
    pipeline_cache: GuardedCache<dyn RhiGraphicsPipeline>,
    framebuffer_cache: GuardedCache<dyn RhiFrameBuffer>,

    /// Staging upload memory (taken in drop so heaps free before teardown)
    staging: Mutex<Option<StagingAllocator>>,

    /// Shared GPU context for all resources
    pub(crate) ctx: Arc<GpuContext>,
}

impl VulkanDevice {
    /// Create a device with a presentation-capable queue for `window`
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &RendererConfig,
    ) -> Result<Self> {
        let display_handle = window.display_handle().map_err(|e| {
            rhi_err!("nova::vulkan", "Failed to get display handle: {}", e)
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            rhi_err!("nova::vulkan", "Failed to get window handle: {}", e)
        })?;
        let surface_extensions =
            ash_window::enumerate_required_extensions(display_handle.as_raw()).map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to get required extensions: {}", e)
            })?;
        Self::init(
            config,
            surface_extensions,
            Some((display_handle.as_raw(), window_handle.as_raw())),
        )
    }

    /// Create a device without presentation support (compute, tests)
    pub fn new_headless(config: &RendererConfig) -> Result<Self> {
        Self::init(config, &[], None)
    }

    fn init(
        config: &RendererConfig,
        surface_extensions: &[*const std::os::raw::c_char],
        raw_handles: Option<(
            raw_window_handle::RawDisplayHandle,
            raw_window_handle::RawWindowHandle,
        )>,
    ) -> Result<Self> {
        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load().map_err(|e| {
                rhi_error!("nova::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            // Application Info
            let app_name = std::ffi::CString::new(config.app_name.as_str())
                .unwrap_or_else(|_| c"Nova Application".to_owned());
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Nova")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let mut extension_names = surface_extensions.to_vec();
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            // Validation layers
            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                rhi_error!("nova::vulkan", "Failed to create Vulkan instance ({}): {:?}",
                    convert::describe_vk_result(e), e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            // Setup debug messenger if validation is enabled
            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                debug::init_debug_config(debug::Config {
                    severity: config.debug_severity,
                });

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(debug::severity_flags(config.debug_severity))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(debug::vulkan_debug_callback));

                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| {
                        rhi_error!("nova::vulkan", "Failed to create debug messenger: {:?}", e);
                        Error::InitializationFailed(format!(
                            "Failed to create debug messenger: {:?}",
                            e
                        ))
                    })?;
                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            // Temporary surface for present-queue selection
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let surface = match raw_handles {
                Some((display, window)) => Some(
                    ash_window::create_surface(&entry, &instance, display, window, None).map_err(
                        |e| {
                            rhi_error!("nova::vulkan", "Failed to create surface: {:?}", e);
                            Error::InitializationFailed(format!(
                                "Failed to create surface: {:?}",
                                e
                            ))
                        },
                    )?,
                ),
                None => None,
            };

            // Pick Physical Device
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                rhi_error!("nova::vulkan", "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!(
                    "Failed to enumerate physical devices: {:?}",
                    e
                ))
            })?;
            let physical_device = physical_devices.into_iter().next().ok_or_else(|| {
                rhi_error!("nova::vulkan", "No Vulkan-capable GPU found");
                Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
            })?;

            // Find Queue Families
            let queue_families =
                instance.get_physical_device_queue_family_properties(physical_device);

            let graphics_family = queue_families
                .iter()
                .enumerate()
                .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|(i, _)| i as u32)
                .ok_or_else(|| {
                    rhi_error!("nova::vulkan", "No graphics queue family found");
                    Error::InitializationFailed("No graphics queue family found".to_string())
                })?;

            // Command pools allocate from the graphics family, so transfer
            // and compute use extra queues of that family when it exposes
            // more than one
            let graphics_queue_count = queue_families[graphics_family as usize]
                .queue_count
                .min(3);

            let present_family = match surface {
                Some(surface) => {
                    let family = (0..queue_families.len() as u32)
                        .find(|&i| {
                            surface_loader
                                .get_physical_device_surface_support(physical_device, i, surface)
                                .unwrap_or(false)
                        })
                        .ok_or_else(|| {
                            rhi_error!("nova::vulkan", "No present queue family found");
                            Error::InitializationFailed(
                                "No present queue family found".to_string(),
                            )
                        })?;
                    // Destroy temporary surface
                    surface_loader.destroy_surface(surface, None);
                    Some(family)
                }
                None => None,
            };

            // Create Logical Device: up to three graphics-family queues
            // (graphics/transfer/compute) plus the present family if distinct
            let graphics_priorities = vec![1.0f32; graphics_queue_count as usize];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family)
                    .queue_priorities(&graphics_priorities),
            ];
            let present_priorities = [1.0];
            if let Some(family) = present_family {
                if family != graphics_family {
                    queue_create_infos.push(
                        vk::DeviceQueueCreateInfo::default()
                            .queue_family_index(family)
                            .queue_priorities(&present_priorities),
                    );
                }
            }

            let device_extension_names = if present_family.is_some() {
                vec![ash::khr::swapchain::NAME.as_ptr()]
            } else {
                vec![]
            };

            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(true)
                .fill_mode_non_solid(true);
            // Timeline semaphores back wait_command dependencies
            let mut vulkan12_features =
                vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features)
                .push_next(&mut vulkan12_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    rhi_error!("nova::vulkan", "Failed to create logical device ({}): {:?}",
                        convert::describe_vk_result(e), e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family, 0);
            let transfer_queue = (graphics_queue_count > 1)
                .then(|| Mutex::new(device.get_device_queue(graphics_family, 1)));
            let compute_queue = (graphics_queue_count > 2)
                .then(|| Mutex::new(device.get_device_queue(graphics_family, 2)));
            let present_queue = present_family.map(|family| device.get_device_queue(family, 0));

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                rhi_error!("nova::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            // Create upload command pool (TRANSIENT + RESET for reusable one-shot uploads)
            let upload_pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family)
                .flags(
                    vk::CommandPoolCreateFlags::TRANSIENT
                        | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                );
            let upload_command_pool =
                device.create_command_pool(&upload_pool_info, None).map_err(|e| {
                    rhi_error!("nova::vulkan", "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!(
                        "Failed to create upload command pool: {:?}",
                        e
                    ))
                })?;

            let limits = instance
                .get_physical_device_properties(physical_device)
                .limits;

            let debug_utils_device = if config.enable_validation {
                Some(ash::ext::debug_utils::Device::new(&instance, &device))
            } else {
                None
            };

            let allocator_arc = Arc::new(Mutex::new(allocator));
            let ctx = Arc::new(GpuContext::new(
                device.clone(),
                Arc::clone(&allocator_arc),
                graphics_queue,
                graphics_family,
                upload_command_pool,
                limits.non_coherent_atom_size,
                instance.clone(),
                debug_utils_device,
                debug_utils_loader,
                debug_messenger,
            ));

            rhi_info!("nova::vulkan",
                "Device created (graphics family {}, {} queue(s))",
                graphics_family, graphics_queue_count);

            Ok(Self {
                entry,
                instance,
                physical_device,
                device,
                graphics_family,
                present_family,
                transfer_queue,
                compute_queue,
                present_queue,
                allocator: ManuallyDrop::new(allocator_arc),
                sampler_cache: GuardedCache::new(),
                input_layout_cache: GuardedCache::new(),
                pipeline_cache: GuardedCache::new(),
                framebuffer_cache: GuardedCache::new(),
                staging: Mutex::new(Some(StagingAllocator::new(config.staging_heap_size))),
                ctx,
            })
        }
    }

    fn allocate_memory(
        &self,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Allocation> {
        self.allocator
            .lock()
            .unwrap()
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                rhi_error!("nova::vulkan", "GPU allocation failed: {:?}", e);
                Error::OutOfMemory
            })
    }

    /// Record and synchronously execute a one-shot upload command
    fn one_shot_upload<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        unsafe {
            let pool = self.ctx.upload_command_pool.lock().unwrap();
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let cmd = self.device.allocate_command_buffers(&alloc_info).map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to allocate upload command buffer: {:?}", e)
            })?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(|e| rhi_err!("nova::vulkan", "Failed to begin upload: {:?}", e))?;

            record(cmd);

            self.device
                .end_command_buffer(cmd)
                .map_err(|e| rhi_err!("nova::vulkan", "Failed to end upload: {:?}", e))?;

            let fence = self
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| rhi_err!("nova::vulkan", "Failed to create upload fence: {:?}", e))?;

            let cmds = [cmd];
            let submit_info = vk::SubmitInfo::default().command_buffers(&cmds);
            {
                let queue = self.ctx.graphics_queue.lock().unwrap();
                if let Err(e) = self.device.queue_submit(*queue, &[submit_info], fence) {
                    self.device.destroy_fence(fence, None);
                    self.device.free_command_buffers(*pool, &cmds);
                    return Err(rhi_err!("nova::vulkan",
                        "Failed to submit upload ({}): {:?}",
                        convert::describe_vk_result(e), e));
                }
            }

            let wait_result = self.device.wait_for_fences(&[fence], true, u64::MAX);
            self.device.destroy_fence(fence, None);
            self.device.free_command_buffers(*pool, &cmds);
            wait_result
                .map_err(|e| rhi_err!("nova::vulkan", "Upload fence wait failed: {:?}", e))?;
            Ok(())
        }
    }

    fn queue_for(&self, queue: QueueKind) -> &Mutex<vk::Queue> {
        match queue {
            QueueKind::Graphics => &self.ctx.graphics_queue,
            QueueKind::Transfer => self
                .transfer_queue
                .as_ref()
                .unwrap_or(&self.ctx.graphics_queue),
            QueueKind::Compute => self
                .compute_queue
                .as_ref()
                .unwrap_or(&self.ctx.graphics_queue),
        }
    }
}

impl RhiDevice for VulkanDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn RhiBuffer>> {
        if desc.size == 0 {
            rhi_bail!("nova::vulkan", "create_buffer: zero-sized buffer");
        }
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(convert::buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = self.device.create_buffer(&create_info, None).map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to create buffer ({}): {:?}",
                    convert::describe_vk_result(e), e)
            })?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let location = if desc.cpu_writable() {
                MemoryLocation::CpuToGpu
            } else {
                MemoryLocation::GpuOnly
            };
            let allocation = match self.allocate_memory(requirements, location, "buffer") {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) =
                self.device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                self.allocator.lock().unwrap().free(allocation).ok();
                self.device.destroy_buffer(buffer, None);
                return Err(rhi_err!("nova::vulkan",
                    "Failed to bind buffer memory ({}): {:?}",
                    convert::describe_vk_result(e), e));
            }

            Ok(Arc::new(Buffer::new(
                Arc::clone(&self.ctx),
                buffer,
                allocation,
                desc.size,
                desc.cpu_writable(),
            )))
        }
    }

    fn create_image(
        &self,
        desc: &ImageDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<dyn RhiImage>> {
        desc.validate()?;
        unsafe {
            let mut usage = desc.usage;
            if initial_data.is_some() {
                usage |= ImageUsage::TRANSFER_DST;
            }
            let mut flags = vk::ImageCreateFlags::empty();
            if matches!(
                desc.image_type,
                nova_rhi::nova::rhi::ImageType::Cube | nova_rhi::nova::rhi::ImageType::CubeArray
            ) {
                flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
            }

            let create_info = vk::ImageCreateInfo::default()
                .flags(flags)
                .image_type(convert::image_type_to_vk(desc.image_type))
                .format(convert::format_to_vk(desc.format))
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: desc.depth,
                })
                .mip_levels(desc.mip_levels)
                .array_layers(desc.array_layers)
                .samples(convert::sample_count_to_vk(desc.samples))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(convert::image_usage_to_vk(usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = self.device.create_image(&create_info, None).map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to create image ({}): {:?}",
                    convert::describe_vk_result(e), e)
            })?;

            let requirements = self.device.get_image_memory_requirements(image);
            let allocation =
                match self.allocate_memory(requirements, MemoryLocation::GpuOnly, "image") {
                    Ok(allocation) => allocation,
                    Err(e) => {
                        self.device.destroy_image(image, None);
                        return Err(e);
                    }
                };
            if let Err(e) =
                self.device
                    .bind_image_memory(image, allocation.memory(), allocation.offset())
            {
                self.allocator.lock().unwrap().free(allocation).ok();
                self.device.destroy_image(image, None);
                return Err(rhi_err!("nova::vulkan",
                    "Failed to bind image memory ({}): {:?}",
                    convert::describe_vk_result(e), e));
            }

            let aspect_mask = if desc.format.is_depth() {
                vk::ImageAspectFlags::DEPTH
            } else {
                vk::ImageAspectFlags::COLOR
            };
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(convert::image_view_type_to_vk(desc.image_type))
                .format(convert::format_to_vk(desc.format))
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: desc.mip_levels,
                    base_array_layer: 0,
                    layer_count: desc.array_layers,
                });
            let view = match self.device.create_image_view(&view_info, None) {
                Ok(view) => view,
                Err(e) => {
                    self.allocator.lock().unwrap().free(allocation).ok();
                    self.device.destroy_image(image, None);
                    return Err(rhi_err!("nova::vulkan",
                        "Failed to create image view ({}): {:?}",
                        convert::describe_vk_result(e), e));
                }
            };

            let vk_image = Arc::new(Image::new(
                Arc::clone(&self.ctx),
                image,
                view,
                allocation,
                desc.clone(),
            ));

            // Stage and upload the initial contents (mip level 0, layer 0)
            if let Some(data) = initial_data {
                let staging_guard = self.staging.lock().unwrap();
                let staging = staging_guard.as_ref().unwrap();
                let slice = staging.allocate(self, data.len() as u64)?;
                slice.write(data)?;

                let upload_image = Arc::clone(&vk_image);
                let slice_buffer = raw_buffer_handle(&slice.buffer);
                let region = vk::BufferImageCopy::default()
                    .buffer_offset(slice.offset)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .image_extent(vk::Extent3D {
                        width: desc.width,
                        height: desc.height,
                        depth: desc.depth,
                    });
                let device = self.device.clone();
                self.one_shot_upload(move |cmd| {
                    upload_image.transition_layout(
                        &device,
                        cmd,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    );
                    unsafe {
                        device.cmd_copy_buffer_to_image(
                            cmd,
                            slice_buffer,
                            upload_image.image,
                            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                            &[region],
                        );
                    }
                    upload_image.transition_layout(
                        &device,
                        cmd,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    );
                })?;
                // The fence wait above makes the heap immediately reclaimable
                staging.submit();
            }

            Ok(vk_image)
        }
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<Arc<dyn RhiShader>> {
        Ok(Arc::new(Shader::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn RhiSampler>> {
        Ok(Arc::new(Sampler::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_input_layout(&self, desc: &InputLayoutDesc) -> Result<Arc<dyn RhiInputLayout>> {
        Ok(Arc::new(InputLayout::create(desc)))
    }

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<Arc<dyn RhiGraphicsPipeline>> {
        Ok(Arc::new(Pipeline::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_framebuffer(&self, desc: &FrameBufferDesc) -> Result<Arc<dyn RhiFrameBuffer>> {
        Ok(Arc::new(FrameBuffer::create(Arc::clone(&self.ctx), desc)?))
    }

    fn create_command_buffer(&self, kind: CommandBufferKind) -> Result<Box<dyn RhiCommandBuffer>> {
        Ok(Box::new(CommandBuffer::create(Arc::clone(&self.ctx), kind)?))
    }

    fn get_or_create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn RhiSampler>> {
        self.sampler_cache
            .get_or_create(desc.content_hash(), || self.create_sampler(desc))
    }

    fn get_or_create_input_layout(&self, desc: &InputLayoutDesc) -> Result<Arc<dyn RhiInputLayout>> {
        self.input_layout_cache
            .get_or_create(desc.content_hash(), || self.create_input_layout(desc))
    }

    fn get_or_create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<Arc<dyn RhiGraphicsPipeline>> {
        self.pipeline_cache
            .get_or_create(desc.content_hash(), || self.create_graphics_pipeline(desc))
    }

    fn get_or_create_framebuffer(&self, desc: &FrameBufferDesc) -> Result<Arc<dyn RhiFrameBuffer>> {
        self.framebuffer_cache
            .get_or_create(desc.content_hash(), || self.create_framebuffer(desc))
    }

    fn submit(&self, queue: QueueKind, buffers: &[&dyn RhiCommandBuffer]) -> Result<()> {
        if buffers.is_empty() {
            return Ok(());
        }

        let mut command_buffers = Vec::with_capacity(buffers.len());
        let mut wait_semaphores = Vec::new();
        let mut wait_values = Vec::new();
        let mut signal_semaphores = Vec::with_capacity(buffers.len());
        let mut signal_values = Vec::with_capacity(buffers.len());

        for buffer in buffers {
            if buffer.state() != RecordState::Closed {
                return Err(Error::InvalidOperation(
                    "submit: command buffer was not closed with end()".to_string(),
                ));
            }
            let vk_buffer =
                unsafe { &*(*buffer as *const dyn RhiCommandBuffer as *const CommandBuffer) };
            command_buffers.push(vk_buffer.cmd);
            for (semaphore, value) in &vk_buffer.waits {
                wait_semaphores.push(*semaphore);
                wait_values.push(*value);
            }
            let next = vk_buffer.timeline_value.fetch_add(1, Ordering::SeqCst) + 1;
            signal_semaphores.push(vk_buffer.timeline);
            signal_values.push(next);
        }

        let wait_stages =
            vec![vk::PipelineStageFlags::ALL_COMMANDS; wait_semaphores.len()];

        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default()
            .wait_semaphore_values(&wait_values)
            .signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        let queue_mutex = self.queue_for(queue);
        let queue_handle = queue_mutex.lock().unwrap();
        unsafe {
            self.device
                .queue_submit(*queue_handle, &[submit_info], vk::Fence::null())
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to submit to {} queue ({}): {:?}",
                        convert::queue_name(queue), convert::describe_vk_result(e), e)
                })?;
        }
        rhi_debug!("nova::vulkan", "Submitted {} command buffer(s) to {} queue",
            buffers.len(), convert::queue_name(queue));
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle().map_err(|e| {
                rhi_err!("nova::vulkan", "device_wait_idle failed ({}): {:?}",
                    convert::describe_vk_result(e), e)
            })
        }
    }
}

/// Extract the VkBuffer from an RHI buffer handle
fn raw_buffer_handle(buffer: &Arc<dyn RhiBuffer>) -> vk::Buffer {
    let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
    vk_buffer.buffer
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            // Resources created by this device must be released before the
            // device is destroyed; caches and staging heaps are flushed
            // here, caller-held handles are the caller's responsibility.
            self.device.device_wait_idle().ok();

            self.pipeline_cache.clear();
            self.framebuffer_cache.clear();
            self.input_layout_cache.clear();
            self.sampler_cache.clear();
            self.staging.lock().unwrap().take();

            {
                let pool = self.ctx.upload_command_pool.lock().unwrap();
                self.device.destroy_command_pool(*pool, None);
            }

            // Drop our allocator reference; the context's reference is
            // intentionally leaked (its Drop is a no-op) so late resource
            // drops can still reach the allocator lock.
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            if let (Some(loader), Some(messenger)) =
                (&self.ctx.debug_utils_loader, self.ctx.debug_messenger)
            {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
