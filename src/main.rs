use std::{env, error::Error, path::PathBuf};

use constant_buffer::{
    ConstantBuffer, ConstantBufferConfig, TransientMemory, ViewProjectionConstantBuffer,
    cgmath::*,
};

const FRAMES: u32 = 8;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match env::args_os().nth(1) {
        Some(path) => ConstantBufferConfig::load(PathBuf::from(path))?,
        None => ConstantBufferConfig::default(),
    };

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter =
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
    let (device, queue) =
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))?;
    let adapter_info = adapter.get_info();
    log::info!(
        "using adapter {} ({:?}, {:?})",
        adapter_info.name,
        adapter_info.device_type,
        adapter_info.backend
    );

    let strategy = config
        .strategy
        .resolve(adapter_info.device_type, &device.limits())?;
    let mut view_projection = ConstantBuffer::<ViewProjectionConstantBuffer>::new();
    if let Some(label) = &config.label {
        view_projection = view_projection.with_label(label.clone());
    }
    view_projection.create(&device, strategy)?;
    let mut transient_memory = TransientMemory::new(&device, &config.transient)?;

    let projection = perspective(Deg(60.), 16. / 9., 0.1, 100.);
    let eye_offset = 0.032;
    for frame in 0..FRAMES {
        let camera = Matrix4::from_translation(vec3(0., 0., -5.))
            * Matrix4::from_angle_y(Deg(frame as f32 * 15.));
        let views = [
            Matrix4::from_translation(vec3(eye_offset, 0., 0.)) * camera,
            Matrix4::from_translation(vec3(-eye_offset, 0., 0.)) * camera,
        ];
        let constants =
            ViewProjectionConstantBuffer::from_view_projection(views, [projection; 2]);
        let binding = view_projection.update(&queue, Some(&mut transient_memory), &constants)?;
        log::info!(
            "frame {frame}: {} bytes of constants at offset {} (dynamic offsets {:?})",
            binding.size(),
            binding.offset(),
            binding.dynamic_offsets()
        );
        queue.submit([]);
        transient_memory.commit_frame();
    }

    transient_memory.garbage_collect();
    log::info!("transient memory: {:?}", transient_memory.statistics());
    Ok(())
}
