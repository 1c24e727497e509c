
use crate::{
    FrameUniforms, LightUniforms, Model, RendererState, StageDescriptor, TerrainPassConfig,
    TerrainRenderer, Transform, TransformUniforms, WaterUniforms
};
use cgmath::{Matrix4, Vector2, Vector3, Vector4};
use error::EngineError;
use model::{AssetConfig, StaticVertex};
use resource::{DeviceCommand, NullDevice, PrimitiveTopology, ShaderStage};
use std::path::{Path, PathBuf};

fn test_models_dir() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop();
    dir.pop();
    dir.push("resources");
    dir.push("test");
    dir.push("models");
    dir
}

fn asset_config() -> AssetConfig {
    AssetConfig::with_models_root(test_models_dir())
}

/// Write a placeholder binary for every stage of the default program list
fn write_stage_binaries(dir: &Path) -> TerrainPassConfig {
    let config = TerrainPassConfig::in_directory(dir);
    for descriptor in config.stages.iter() {
        std::fs::write(&descriptor.path, [0x03, 0x02, 0x23, 0x07]).unwrap();
    }
    config
}

/// Write a one-triangle model whose material lists the given number of diffuse maps
fn write_model_with_diffuse_maps(root: &Path, name: &str, diffuse_maps: usize) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(format!("{}.obj", name)),
        "v 0 0 0\nv 1 0 0\nv 0 0 1\nvt 0 0\nvn 0 1 0\nf 1/1/1 2/1/1 3/1/1\n").unwrap();
    let mut material = String::from("Kd 1 1 1\n");
    for i in 0..diffuse_maps {
        material.push_str(&format!("map_Kd layer{}.png\n", i));
    }
    material.push_str("disp height.png\n");
    std::fs::write(dir.join(format!("{}.mtl", name)), material).unwrap();
}

fn shader_ids(renderer: &TerrainRenderer<NullDevice>) -> Vec<(ShaderStage, u32)> {
    match renderer.state() {
        RendererState::Ready(resources) => resources.shaders()
            .map(|(stage, shader)| (stage, shader.id()))
            .collect(),
        RendererState::Uninitialized { .. } => panic!("Renderer did not load")
    }
}

fn test_frame() -> FrameUniforms {
    FrameUniforms {
        view: Matrix4::from_translation(Vector3::new(0.0, -2.0, -5.0)),
        projection: Matrix4::from_nonuniform_scale(0.5, 0.75, -1.0),
        light: Matrix4::from_scale(0.25)
    }
}

fn assert_close(actual: Vector4<f32>, expected: [f32; 3]) {
    let tolerance = 1e-5;
    assert!((actual.x - expected[0]).abs() < tolerance, "x: {} != {}", actual.x, expected[0]);
    assert!((actual.y - expected[1]).abs() < tolerance, "y: {} != {}", actual.y, expected[1]);
    assert!((actual.z - expected[2]).abs() < tolerance, "z: {} != {}", actual.z, expected[2]);
}

#[test]
fn model_loads_mesh_and_uploads_vertices() {
    let device = NullDevice::new();
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Quad", Transform::default())
        .unwrap();

    assert_eq!(model.vertex_count(), 6);
    assert_eq!(model.mesh().faces().len(), 2);
    assert_eq!(model.mesh().diffuse_textures().len(), 2);
    assert!(model.displacement_texture().is_none());

    let vertices = model.mesh().vertices();
    assert_eq!(model.vertex_buffer().size_bytes(), 6 * std::mem::size_of::<StaticVertex>());
    assert_eq!(&model.vertex_buffer().contents()[..], bytemuck::cast_slice::<StaticVertex, u8>(&vertices));
    assert_eq!(model.position_buffer().size_bytes(), 6 * 12);
    assert_eq!(
        &model.position_buffer().contents()[..],
        bytemuck::cast_slice::<[f32; 3], u8>(model.mesh().positions()));
    assert_eq!(model.material_buffer().size_bytes(), 48);
    assert_eq!(model.material_data().diffuse, [0.8, 0.6, 0.4, 0.0]);
}

#[test]
fn dropping_a_model_releases_everything_it_created() {
    let device = NullDevice::new();
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();

    // Two diffuse maps, one displacement map, material buffer, vertex and position buffers
    assert_eq!(device.live_resource_count(), 6);
    drop(model);
    assert_eq!(device.live_resource_count(), 0);
    assert_eq!(device.released().len(), 6);

    let mut water: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();
    water.enable_water(&device).unwrap();
    let water_buffer_id = water.water_buffer().unwrap().id();
    assert_eq!(device.live_resource_count(), 7);
    drop(water);
    assert_eq!(device.live_resource_count(), 0);
    assert!(device.released().contains(&water_buffer_id));
}

#[test]
fn material_buffer_failure_fails_the_whole_load() {
    let device = NullDevice::new();
    device.fail_buffers_after(0);
    let result: Result<Model<NullDevice>, EngineError> =
        Model::new(&device, &asset_config(), "Terrain", Transform::default());
    assert!(matches!(result, Err(EngineError::OpFailed(_))));

    // Textures loaded before the buffer was refused do not leak
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn vertex_buffer_failure_releases_the_mesh() {
    let device = NullDevice::new();
    device.fail_buffers_after(1);
    let result: Result<Model<NullDevice>, EngineError> =
        Model::new(&device, &asset_config(), "Quad", Transform::default());
    assert!(matches!(result, Err(EngineError::OpFailed(_))));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn missing_model_is_a_missing_resource() {
    let device = NullDevice::new();
    let result: Result<Model<NullDevice>, EngineError> =
        Model::new(&device, &asset_config(), "NoSuchModel", Transform::default());
    assert!(matches!(result, Err(EngineError::MissingResource(_))));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn model_without_faces_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("Empty");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("Empty.obj"), "v 0 0 0\n").unwrap();
    std::fs::write(dir.join("Empty.mtl"), "Kd 1 1 1\n").unwrap();

    let device = NullDevice::new();
    let config = AssetConfig::with_models_root(root.path());
    let result: Result<Model<NullDevice>, EngineError> =
        Model::new(&device, &config, "Empty", Transform::default());
    assert!(matches!(result, Err(EngineError::Malformed(_))));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn world_matrix_scales_then_rotates_then_translates() {
    let device = NullDevice::new();
    let transform = Transform::new(
        Vector3::new(10.0, 0.0, 0.0),
        Vector3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
        Vector3::new(2.0, 2.0, 2.0));
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", transform).unwrap();

    let point = model.world_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert_close(point, [10.0, 0.0, -2.0]);
}

#[test]
fn roll_is_applied_before_pitch() {
    let transform = Transform::new(
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(std::f32::consts::FRAC_PI_2, 0.0, std::f32::consts::FRAC_PI_2),
        Vector3::new(1.0, 1.0, 1.0));
    let point = transform.world_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert_close(point, [0.0, 0.0, 1.0]);
}

#[test]
fn setters_keep_world_matrix_current() {
    let device = NullDevice::new();
    let mut model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();

    model.set_translation(Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(model.translation(), Vector3::new(1.0, 2.0, 3.0));
    assert_close(model.world_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0), [1.0, 2.0, 3.0]);

    model.set_scale(Vector3::new(3.0, 3.0, 3.0));
    assert_close(model.world_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0), [4.0, 2.0, 3.0]);

    model.set_rotation(Vector3::new(0.0, 0.0, std::f32::consts::PI));
    assert_eq!(model.rotation(), Vector3::new(0.0, 0.0, std::f32::consts::PI));
    assert_close(model.world_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0), [-2.0, 2.0, 3.0]);
}

#[test]
fn water_offset_wraps_into_unit_range() {
    let device = NullDevice::new();
    let mut model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();

    let speed = Vector2::new(0.75, -0.25);
    model.update_water(speed, 1.0);
    assert_eq!(model.uv_offset(), Vector2::new(0.75, 0.75));
    model.update_water(speed, 1.0);
    assert_eq!(model.uv_offset(), Vector2::new(0.5, 0.5));
    assert_eq!(model.water_speed(), speed);

    for _ in 0..100_000 {
        model.update_water(Vector2::new(0.37, -1.9), 0.016);
        let offset = model.uv_offset();
        assert!((0.0..1.0).contains(&offset.x));
        assert!((0.0..1.0).contains(&offset.y));
    }
}

#[test]
fn water_state_reaches_its_constant_buffer() {
    let mut device = NullDevice::new();
    let mut model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();
    assert!(model.water_buffer().is_none());
    let result = model.write_water_buffer(&mut device);
    assert!(matches!(result, Err(EngineError::MissingResource(_))));

    model.enable_water(&device).unwrap();
    let buffer_id = model.water_buffer().unwrap().id();
    model.enable_water(&device).unwrap();
    assert_eq!(model.water_buffer().unwrap().id(), buffer_id);
    assert_eq!(model.water_buffer().unwrap().size_bytes(), 16);

    model.update_water(Vector2::new(0.25, 0.5), 1.0);
    model.write_water_buffer(&mut device).unwrap();
    let expected = WaterUniforms { uv_offset: [0.25, 0.5], speed: [0.25, 0.5] };
    assert_eq!(&model.water_buffer().unwrap().contents()[..], bytemuck::bytes_of(&expected));
    assert_eq!(
        device.commands(),
        &[DeviceCommand::WriteBuffer { buffer: buffer_id, size_bytes: 16 }]);
}

#[test]
fn renderer_loads_every_stage_in_pipeline_order() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);

    assert!(renderer.is_ready());
    assert!(renderer.failure_reason().is_none());
    let stages: Vec<ShaderStage> = shader_ids(&renderer).iter().map(|(stage, _)| *stage).collect();
    assert_eq!(stages, ShaderStage::ALL.to_vec());

    // Five programs and two constant buffers
    assert_eq!(device.live_resource_count(), 7);
    drop(renderer);
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn render_issues_the_full_terrain_sequence() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let mut device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();

    let (transform_id, light_id) = match renderer.state() {
        RendererState::Ready(resources) => (resources.transform_buffer().id(), resources.light_buffer().id()),
        RendererState::Uninitialized { .. } => panic!("Renderer did not load")
    };
    let material_id = model.material_buffer().id();
    let diffuse_ids: Vec<u32> = model.mesh().diffuse_textures().iter().map(|t| t.id()).collect();
    let displacement_id = model.displacement_texture().unwrap().id();

    renderer.render(&mut device, &model, &test_frame()).unwrap();

    let mut expected: Vec<DeviceCommand> = shader_ids(&renderer).into_iter()
        .map(|(stage, id)| DeviceCommand::SetShader { stage, shader: Some(id) })
        .collect();
    expected.extend([
        DeviceCommand::SetVertexLayout { stride: 32 },
        DeviceCommand::SetTopology(PrimitiveTopology::ThreeControlPointPatchList),
        DeviceCommand::WriteBuffer { buffer: transform_id, size_bytes: 128 },
        DeviceCommand::BindConstantBuffer { stage: ShaderStage::Domain, slot: 0, buffer: transform_id },
        DeviceCommand::WriteBuffer { buffer: material_id, size_bytes: 48 },
        DeviceCommand::BindConstantBuffer { stage: ShaderStage::Pixel, slot: 1, buffer: material_id },
        DeviceCommand::WriteBuffer { buffer: light_id, size_bytes: 64 },
        DeviceCommand::BindConstantBuffer { stage: ShaderStage::Pixel, slot: 0, buffer: light_id },
        DeviceCommand::BindTexture { stage: ShaderStage::Pixel, slot: 0, texture: diffuse_ids[0] },
        DeviceCommand::BindTexture { stage: ShaderStage::Pixel, slot: 1, texture: diffuse_ids[1] },
        DeviceCommand::BindTexture { stage: ShaderStage::Pixel, slot: 2, texture: displacement_id },
        DeviceCommand::BindTexture { stage: ShaderStage::Domain, slot: 0, texture: displacement_id },
        DeviceCommand::BindVertexBuffer { buffer: model.vertex_buffer().id(), stride: 32 },
        DeviceCommand::Draw { vertex_count: 3 },
        DeviceCommand::SetShader { stage: ShaderStage::Hull, shader: None },
        DeviceCommand::SetShader { stage: ShaderStage::Domain, shader: None },
        DeviceCommand::SetShader { stage: ShaderStage::Geometry, shader: None }
    ]);
    assert_eq!(device.commands(), &expected[..]);
}

#[test]
fn render_draws_once_and_leaves_optional_stages_unbound() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let mut device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();

    renderer.render(&mut device, &model, &test_frame()).unwrap();

    let draws: Vec<&DeviceCommand> = device.commands().iter()
        .filter(|command| matches!(command, DeviceCommand::Draw { .. }))
        .collect();
    assert_eq!(draws, vec![&DeviceCommand::Draw { vertex_count: 3 }]);
    for stage in ShaderStage::OPTIONAL.iter() {
        assert_eq!(device.bound_shader(*stage), None);
    }
    assert!(device.bound_shader(ShaderStage::Vertex).is_some());
    assert!(device.bound_shader(ShaderStage::Pixel).is_some());
}

#[test]
fn render_uploads_frame_and_material_records() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let mut device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let transform = Transform::from_translation(Vector3::new(4.0, 0.0, -1.0));
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", transform).unwrap();
    let frame = test_frame();

    renderer.render(&mut device, &model, &frame).unwrap();

    let RendererState::Ready(resources) = renderer.state() else {
        panic!("Renderer did not load");
    };
    let expected_transform = TransformUniforms::new(&frame, model.world_matrix());
    assert_eq!(&resources.transform_buffer().contents()[..], bytemuck::bytes_of(&expected_transform));
    let expected_light = LightUniforms::new(&frame);
    assert_eq!(&resources.light_buffer().contents()[..], bytemuck::bytes_of(&expected_light));
    assert_eq!(&model.material_buffer().contents()[..], bytemuck::bytes_of(model.material_data()));

    let view_perspective: [[f32; 4]; 4] = (frame.projection * frame.view).into();
    assert_eq!(expected_transform.view_perspective, view_perspective);
    assert_eq!(expected_transform.world[3], [4.0, 0.0, -1.0, 1.0]);
}

#[test]
fn missing_stage_binary_leaves_renderer_not_ready() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let geometry_path = config.stages.iter()
        .find(|descriptor| descriptor.stage == ShaderStage::Geometry)
        .map(|descriptor| descriptor.path.clone())
        .unwrap();
    std::fs::remove_file(&geometry_path).unwrap();

    let mut device = NullDevice::new();
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();
    let live_before = device.live_resource_count();

    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    assert!(!renderer.is_ready());
    let reason = renderer.failure_reason().unwrap();
    assert!(reason.is_missing_resource());
    assert!(reason.to_string().contains("geometry stage"));

    // Programs created for earlier stages are already released
    assert_eq!(device.live_resource_count(), live_before);
    assert_eq!(device.released().len(), 3);

    let result = renderer.render(&mut device, &model, &test_frame());
    assert!(matches!(result, Err(EngineError::NotReady(_))));
    assert!(device.commands().is_empty());
}

#[test]
fn rejected_program_is_reported_by_try_new() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let device = NullDevice::new();
    device.reject_stage(ShaderStage::Hull);

    let result = TerrainRenderer::<NullDevice>::try_new(&device, &config);
    match result {
        Err(EngineError::OpFailed(message)) => assert!(message.contains("hull stage")),
        Err(other) => panic!("Unexpected error {}", other),
        Ok(_) => panic!("Renderer loaded with a rejected stage")
    }
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn model_without_displacement_map_is_refused_before_any_command() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let mut device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Quad", Transform::default())
        .unwrap();

    let result = renderer.render(&mut device, &model, &test_frame());
    assert!(matches!(result, Err(EngineError::MissingResource(_))));
    assert!(device.commands().is_empty());
}

#[test]
fn every_diffuse_map_is_bound_before_the_draw() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let models = tempfile::tempdir().unwrap();
    write_model_with_diffuse_maps(models.path(), "Layered", 5);

    let mut device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let model: Model<NullDevice> = Model::new(
        &device,
        &AssetConfig::with_models_root(models.path()),
        "Layered",
        Transform::default()).unwrap();
    assert_eq!(model.mesh().diffuse_textures().len(), 5);

    renderer.render(&mut device, &model, &test_frame()).unwrap();

    let pixel_slots: Vec<u32> = device.commands().iter()
        .filter_map(|command| match command {
            DeviceCommand::BindTexture { stage: ShaderStage::Pixel, slot, .. } => Some(*slot),
            _ => None
        })
        .collect();
    assert_eq!(pixel_slots, vec![0, 1, 2, 3, 4, 2]);
    assert!(device.commands().contains(&DeviceCommand::Draw { vertex_count: 3 }));
}

#[test]
fn textures_beyond_the_device_slots_are_refused_before_any_command() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let models = tempfile::tempdir().unwrap();
    write_model_with_diffuse_maps(models.path(), "Layered", 5);

    let mut device = NullDevice::new();
    device.limit_texture_slots(4);
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let model: Model<NullDevice> = Model::new(
        &device,
        &AssetConfig::with_models_root(models.path()),
        "Layered",
        Transform::default()).unwrap();

    let result = renderer.render(&mut device, &model, &test_frame());
    assert!(matches!(result, Err(EngineError::OpFailed(_))));
    assert!(device.commands().is_empty());

    // Four maps fit exactly
    let fitting = tempfile::tempdir().unwrap();
    write_model_with_diffuse_maps(fitting.path(), "Layered", 4);
    let model: Model<NullDevice> = Model::new(
        &device,
        &AssetConfig::with_models_root(fitting.path()),
        "Layered",
        Transform::default()).unwrap();
    renderer.render(&mut device, &model, &test_frame()).unwrap();
}

#[test]
fn failed_bind_still_unbinds_optional_stages() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let mut device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();
    device.fail_texture_binds();

    let result = renderer.render(&mut device, &model, &test_frame());
    assert!(matches!(result, Err(EngineError::OpFailed(_))));
    assert!(!device.commands().iter().any(|command| matches!(command, DeviceCommand::Draw { .. })));
    for stage in ShaderStage::OPTIONAL.iter() {
        assert_eq!(device.bound_shader(*stage), None);
    }
    let commands = device.commands();
    assert_eq!(&commands[commands.len() - 3..], &[
        DeviceCommand::SetShader { stage: ShaderStage::Hull, shader: None },
        DeviceCommand::SetShader { stage: ShaderStage::Domain, shader: None },
        DeviceCommand::SetShader { stage: ShaderStage::Geometry, shader: None }
    ]);
}

#[test]
fn textures_added_at_runtime_are_bound() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let mut device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let mut model: Model<NullDevice> = Model::new(&device, &asset_config(), "Quad", Transform::default())
        .unwrap();

    let models_dir = test_models_dir();
    model.set_displacement_texture(&device, &models_dir.join("Quad").join("height.png")).unwrap();
    assert_eq!(
        model.displacement_texture().unwrap().path(),
        models_dir.join("Quad").join("height.png").as_path());

    renderer.render(&mut device, &model, &test_frame()).unwrap();
    let texture_binds = device.take_commands().into_iter()
        .filter(|command| matches!(command, DeviceCommand::BindTexture { .. }))
        .count();
    assert_eq!(texture_binds, 4);

    // A third diffuse map lands in the slot after the first two
    model.add_texture(&device, &models_dir.join("Quad").join("sand.png")).unwrap();
    let added_id = model.mesh().diffuse_textures()[2].id();
    renderer.render(&mut device, &model, &test_frame()).unwrap();
    assert!(device.commands().contains(
        &DeviceCommand::BindTexture { stage: ShaderStage::Pixel, slot: 2, texture: added_id }));
    assert!(device.commands().contains(&DeviceCommand::Draw { vertex_count: 6 }));
}

#[test]
fn replacing_displacement_map_releases_the_old_one() {
    let device = NullDevice::new();
    let mut model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();
    let old_id = model.displacement_texture().unwrap().id();
    model.set_displacement_texture(&device, Path::new("other.png")).unwrap();
    assert_eq!(device.released(), vec![old_id]);
    assert_eq!(device.live_resource_count(), 6);
}

#[test]
fn teardown_releases_each_resource_once() {
    let shaders = tempfile::tempdir().unwrap();
    let config = write_stage_binaries(shaders.path());
    let mut device = NullDevice::new();
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    let model: Model<NullDevice> = Model::new(&device, &asset_config(), "Terrain", Transform::default())
        .unwrap();
    renderer.render(&mut device, &model, &test_frame()).unwrap();

    drop(model);
    drop(renderer);
    assert_eq!(device.live_resource_count(), 0);
    let mut released = device.released();
    let count = released.len();
    released.sort_unstable();
    released.dedup();
    assert_eq!(released.len(), count);
    assert_eq!(count, 13);
}

#[test]
fn default_pass_config_lists_each_stage_once() {
    let config = TerrainPassConfig::default();
    config.validate().unwrap();
    assert_eq!(config.stages[0], StageDescriptor::new(ShaderStage::Vertex, "shaders/terrain.vert.spv"));
    assert_eq!(config.stages[4], StageDescriptor::new(ShaderStage::Pixel, "shaders/terrain.frag.spv"));
}

#[test]
fn pass_config_reads_toml_in_any_order() {
    let text = r#"
[[stages]]
stage = "pixel"
path = "a/frag.spv"

[[stages]]
stage = "geometry"
path = "a/geom.spv"

[[stages]]
stage = "domain"
path = "a/tese.spv"

[[stages]]
stage = "hull"
path = "a/tesc.spv"

[[stages]]
stage = "vertex"
path = "a/vert.spv"
"#;
    let config = TerrainPassConfig::from_toml_str(text).unwrap();
    let ordered: Vec<ShaderStage> = config.ordered_stages().iter().map(|d| d.stage).collect();
    assert_eq!(ordered, ShaderStage::ALL.to_vec());
    assert_eq!(config.ordered_stages()[0].path, PathBuf::from("a/vert.spv"));
}

#[test]
fn pass_config_rejects_duplicate_or_missing_stages() {
    let text = r#"
[[stages]]
stage = "vertex"
path = "a.spv"

[[stages]]
stage = "vertex"
path = "b.spv"
"#;
    let result = TerrainPassConfig::from_toml_str(text);
    assert!(matches!(result, Err(EngineError::Config(_))));

    let result = TerrainPassConfig::from_toml_str("stages = 3");
    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn invalid_pass_config_leaves_renderer_uninitialized() {
    let device = NullDevice::new();
    let config = TerrainPassConfig { stages: vec![] };
    let renderer: TerrainRenderer<NullDevice> = TerrainRenderer::new(&device, &config);
    assert!(matches!(renderer.failure_reason(), Some(EngineError::Config(_))));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn pass_config_file_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("terrain.toml");
    std::fs::write(&path, "[[stages]]\nstage = \"compute\"\npath = \"x.spv\"\n").unwrap();
    match TerrainPassConfig::from_toml_file(&path) {
        Err(EngineError::Config(message)) => assert!(message.contains("terrain.toml")),
        other => panic!("Unexpected result {:?}", other.map(|_| ()))
    }
    assert!(matches!(
        TerrainPassConfig::from_toml_file(&dir.path().join("absent.toml")),
        Err(EngineError::MissingResource(_))));
}
