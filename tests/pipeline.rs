//! End-to-end tests of the draw pipeline against the recording backend.

use std::cell::Cell;
use std::rc::Rc;

use strata::backend::{DeviceCommand, RecordingDevice};
use strata::color::Color;
use strata::config::RendererConfig;
use strata::geometry::{Point, Rect, Size};
use strata::path::Path;
use strata::renderer::device::{BufferDescriptor, BufferUsages, LoadOp, ResourceBinding};
use strata::renderer::draw_pass::VIEW_SET;
use strata::renderer::tessellator::{self, Tessellator};
use strata::renderer::{
    Batch, Camera, DrawCommand, DrawData, FrameStatus, GraphicsContext, LayerFlags, LayerTree,
    RenderDevice, SkipReason, UiRenderNode, ViewInput, ViewUniform,
};
use strata::text::{Glyph, GlyphBounds, TextRun};
use strata::texture::{Texture, UvRect};
use strata::transform::Transform;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn glyph(atlas: Texture, pen_x: f32) -> Glyph {
    Glyph {
        bounds: GlyphBounds::new(pen_x, 0.0, pen_x + 8.0, 12.0),
        uv: UvRect::new([0.0, 0.0], [0.125, 0.25]),
        foreground: Color::BLACK,
        outline: Color::TRANSPARENT,
        atlas,
    }
}

fn assert_tiles(batches: &[Batch], total: usize) {
    let mut next = 0usize;
    for batch in batches {
        assert_eq!(batch.index_offset as usize, next, "gap or overlap at {}", next);
        next += batch.index_count as usize;
    }
    assert_eq!(next, total);
}

fn draw_calls(device: &RecordingDevice) -> Vec<(u32, u64)> {
    device
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            DeviceCommand::DrawIndexed {
                index_count,
                index_byte_offset,
                ..
            } => Some((index_count, index_byte_offset)),
            _ => None,
        })
        .collect()
}

fn camera() -> Camera {
    Camera {
        viewport: Size::new(800.0, 600.0),
        scale_factor: 2.0,
        uniform: None,
    }
}

#[test]
fn test_tessellation_is_deterministic() {
    let mut device = RecordingDevice::new();
    let atlas = device.create_texture(64, 64);

    let mut ctx = GraphicsContext::new();
    ctx.rotate(0.3);
    ctx.draw_rect(Rect::new(10.0, 20.0, 30.0, 40.0), Color::RED);
    ctx.draw_circle(Point::new(5.0, 5.0), 4.0, Color::WHITE);
    ctx.draw_glyph(&glyph(atlas, 3.0));
    let mut path = Path::new();
    path.move_to((0.0, 0.0)).curve_to((9.0, 9.0), (2.0, 7.0), (6.0, -3.0));
    ctx.draw_path(path, Color::BLACK);
    let commands = ctx.take_commands();

    let mut first = DrawData::default();
    let mut second = DrawData::default();
    first.record(&commands);
    second.record(&commands);

    let bytes = |data: &DrawData| {
        (
            bytemuck::cast_slice::<_, u8>(data.quads.vertices()).to_vec(),
            bytemuck::cast_slice::<_, u8>(data.circles.vertices()).to_vec(),
            bytemuck::cast_slice::<_, u8>(data.lines.vertices()).to_vec(),
            bytemuck::cast_slice::<_, u8>(data.glyphs.vertices()).to_vec(),
        )
    };
    assert_eq!(bytes(&first), bytes(&second));
    assert_eq!(first.lines.indices(), second.lines.indices());
}

#[test]
fn test_quad_topology() {
    let transform = Rect::new(0.0, 0.0, 4.0, 2.0).to_transform();
    let vertices = tessellator::tessellate_quad(&transform, None, Color::RED, 0);
    assert_eq!(vertices.len(), 4);
    assert_eq!(vertices[0].position, [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(vertices[2].position, [4.0, 2.0, 0.0, 1.0]);

    for k in [0u32, 4, 40] {
        assert_eq!(
            tessellator::generate_quad_indices(k),
            [k, k + 1, k + 2, k + 2, k + 3, k]
        );
    }
}

#[test]
fn test_batches_tile_index_range_in_draw_order() {
    let mut device = RecordingDevice::new();
    let textures: Vec<Texture> = (0..7).map(|_| device.create_texture(8, 8)).collect();

    // Small linear congruential sequence so the test is reproducible.
    let mut seed = 12345u32;
    for limit in [1usize, 2, 3, 5] {
        let config = RendererConfig::default().max_textures_per_batch(limit);
        let mut data = DrawData::new(&config);
        let mut ctx = GraphicsContext::new();
        let mut drawn = Vec::new();
        for i in 0..50 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let texture = textures[(seed >> 16) as usize % textures.len()];
            drawn.push(texture);
            ctx.draw_textured_rect(Rect::new(i as f32, 0.0, 1.0, 1.0), texture, Color::WHITE);
        }
        data.record(&ctx.take_commands());

        let batches = data.quads.batches();
        assert_tiles(batches, data.quads.indices().len());
        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.texture_index as usize, i);
            assert!(data.quads.texture_groups()[i].len() <= limit);
        }

        // Each quad samples the texture it was drawn with.
        let mut quad = 0;
        for batch in batches {
            let group = &data.quads.texture_groups()[batch.texture_index as usize];
            for _ in 0..batch.index_count / 6 {
                let slot = data.quads.vertices()[quad * 4].texture_index as usize;
                assert_eq!(group[slot], Some(drawn[quad]));
                quad += 1;
            }
        }
        assert_eq!(quad, drawn.len());
    }
}

#[test]
fn test_twenty_textures_make_two_batches() {
    init_logger();
    let mut device = RecordingDevice::new();
    let target = device.create_render_target(800, 600);
    let mut node = UiRenderNode::new(device.create_ui_pipelines());

    let mut ctx = GraphicsContext::new();
    for i in 0..20 {
        let texture = device.create_texture(16, 16);
        ctx.draw_textured_rect(Rect::new(i as f32 * 10.0, 0.0, 8.0, 8.0), texture, Color::WHITE);
    }
    let mut data = DrawData::default();
    data.record(&ctx.take_commands());

    let batches = data.quads.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].index_count, 16 * 6);
    assert_eq!(batches[1].index_count, 4 * 6);
    assert_eq!(batches[1].index_offset, 16 * 6);

    let view = ViewInput {
        view: 1,
        camera: Some(camera()),
        target: Some(target),
    };
    let status = node.execute(&mut device, &view, &mut data).unwrap();
    match status {
        FrameStatus::Rendered(stats) => {
            assert_eq!(stats.draw_calls, 2);
            assert_eq!(stats.skipped_batches, 0);
        }
        other => panic!("expected a rendered frame, got {:?}", other),
    }
    assert_eq!(draw_calls(&device), vec![(96, 0), (24, 96 * 4)]);

    let sets = &data.quads.resource_sets();
    assert_eq!(sets.len(), 2);
    assert_eq!(device.resource_set(sets[0]).unwrap().entries.len(), 16);
    assert_eq!(device.resource_set(sets[1]).unwrap().entries.len(), 4);
}

#[test]
fn test_layer_cache_hit_and_miss() {
    let calls = Rc::new(Cell::new(0));
    let mut tree = LayerTree::new();
    let counter = Rc::clone(&calls);
    let layer = tree.create_layer(
        Rect::new(0.0, 0.0, 100.0, 40.0),
        LayerFlags::default(),
        move |_tree, ctx, frame| {
            counter.set(counter.get() + 1);
            ctx.draw_rect(frame, Color::RED);
        },
    );

    let ctx = GraphicsContext::new();
    let draw = |tree: &mut LayerTree, ctx: &GraphicsContext| {
        let mut ctx = ctx.clone();
        tree.draw_layer(layer, &mut ctx);
        ctx.take_commands()
    };

    let first = draw(&mut tree, &ctx);
    let second = draw(&mut tree, &ctx);
    assert_eq!(calls.get(), 1);
    assert_eq!(first, second);
    assert!(matches!(
        first.first(),
        Some(DrawCommand::BeginLayer {
            cacheable: true,
            ..
        })
    ));

    let mut moved = ctx.clone();
    moved.translate_by(5.0, 0.0);
    draw(&mut tree, &moved);
    assert_eq!(calls.get(), 2);

    tree.invalidate(layer);
    draw(&mut tree, &moved);
    assert_eq!(calls.get(), 3);
    draw(&mut tree, &moved);
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_invalidation_propagates_only_when_flagged() {
    for (child_flags, parent_stays_cached) in [
        (LayerFlags::default(), false),
        (LayerFlags::ALLOWS_CACHING, true),
    ] {
        let mut tree = LayerTree::new();
        let frame = Rect::new(0.0, 0.0, 10.0, 10.0);
        let parent = tree.create_layer(frame, LayerFlags::default(), |_, ctx, frame| {
            ctx.draw_rect(frame, Color::BLACK)
        });
        let child = tree.create_layer(frame, child_flags, |_, ctx, frame| {
            ctx.draw_rect(frame, Color::WHITE)
        });
        tree.set_parent(child, Some(parent)).unwrap();

        let mut ctx = GraphicsContext::new();
        tree.draw_layer(parent, &mut ctx);
        assert!(tree.is_cached(parent));

        tree.invalidate(child);
        assert_eq!(tree.is_cached(parent), parent_stays_cached);
    }
}

#[test]
fn test_quadratic_curve_flattening() {
    let mut path = Path::new();
    path.move_to((0.0, 0.0)).quad_curve_to((10.0, 0.0), (5.0, 5.0));

    let geometry =
        Tessellator::new().tessellate_path(&path, 1.0, Color::BLACK, &Transform::IDENTITY);
    assert_eq!(geometry.line_count(), 16);
    assert_eq!(geometry.vertices.len(), 32);
    assert_eq!(geometry.indices.len(), 32);

    let curve = |t: f64| {
        let u = 1.0 - t;
        (2.0 * u * t * 5.0 + t * t * 10.0, 2.0 * u * t * 5.0)
    };
    let fine = 100_000;
    let analytic: f64 = (0..fine)
        .map(|i| {
            let (ax, ay) = curve(i as f64 / fine as f64);
            let (bx, by) = curve((i + 1) as f64 / fine as f64);
            (bx - ax).hypot(by - ay)
        })
        .sum();

    let error = |segments: u32| {
        let geometry = Tessellator::with_curve_segments(segments).tessellate_path(
            &path,
            1.0,
            Color::BLACK,
            &Transform::IDENTITY,
        );
        let length: f64 = geometry
            .vertices
            .chunks(2)
            .map(|pair| {
                let (a, b) = (pair[0].position, pair[1].position);
                Point::new(a[0], a[1]).distance(Point::new(b[0], b[1])) as f64
            })
            .sum();
        (analytic - length).abs()
    };

    let (coarse, medium, dense) = (error(4), error(16), error(64));
    assert!(coarse > medium, "{} <= {}", coarse, medium);
    assert!(medium > dense, "{} <= {}", medium, dense);
}

#[test]
fn test_close_subpath_semantics() {
    let tessellator = Tessellator::new();

    let mut path = Path::new();
    path.move_to((0.0, 0.0)).line_to((10.0, 0.0)).close_subpath();
    let geometry = tessellator.tessellate_path(&path, 1.0, Color::BLACK, &Transform::IDENTITY);
    assert_eq!(geometry.line_count(), 2);
    assert_eq!(geometry.vertices[3].position, [0.0, 0.0, 0.0]);

    let mut lonely = Path::new();
    lonely.close_subpath();
    let geometry = tessellator.tessellate_path(&lonely, 1.0, Color::BLACK, &Transform::IDENTITY);
    assert_eq!(geometry.line_count(), 0);
    assert!(geometry.indices.is_empty());
}

#[test]
fn test_opacity_composition() {
    let mut ctx = GraphicsContext::new();
    ctx.set_opacity(0.5);
    ctx.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::RED);
    ctx.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::TRANSPARENT);

    let colors: Vec<Color> = ctx
        .take_commands()
        .into_iter()
        .filter_map(|c| match c {
            DrawCommand::DrawQuad { color, .. } => Some(color),
            _ => None,
        })
        .collect();
    assert!(approx_eq(colors[0].a, 0.5));
    assert!(approx_eq(colors[0].r, 1.0));
    assert_eq!(colors[1], Color::TRANSPARENT);
}

#[test]
fn test_rect_and_text_run_end_to_end() {
    init_logger();
    let mut device = RecordingDevice::new();
    let target = device.create_render_target(800, 600);
    let atlas = device.create_texture(256, 256);
    let mut node = UiRenderNode::new(device.create_ui_pipelines());

    let mut ctx = GraphicsContext::new();
    ctx.draw_rect(Rect::new(10.0, 10.0, 100.0, 50.0), Color::RED);
    let run = TextRun::new((0..5).map(|i| glyph(atlas, i as f32 * 9.0)).collect());
    ctx.draw_text_run(&run);
    ctx.commit_draw();

    let mut data = DrawData::default();
    data.record(&ctx.take_commands());
    assert_eq!(data.quads.batches().len(), 1);
    assert_eq!(data.glyphs.batches().len(), 1);
    assert_eq!(data.quads.indices().len(), 6);
    assert_eq!(data.glyphs.indices().len(), 30);

    let view = ViewInput {
        view: 7,
        camera: Some(camera()),
        target: Some(target),
    };
    let status = node.execute(&mut device, &view, &mut data).unwrap();
    assert!(matches!(status, FrameStatus::Rendered(stats) if stats.draw_calls == 2));
    assert_eq!(draw_calls(&device), vec![(6, 0), (30, 0)]);

    let log = device.commands();
    assert!(log.contains(&DeviceCommand::BeginRenderPass {
        label: "UI Render Pass",
        target,
        load: LoadOp::Load,
    }));
    assert!(matches!(log.last(), Some(DeviceCommand::Commit { .. })));
}

#[test]
fn test_render_node_binds_its_own_view_uniform() {
    let mut device = RecordingDevice::new();
    let target = device.create_render_target(800, 600);
    let scene_uniform = device
        .create_buffer(&BufferDescriptor {
            label: "scene camera",
            size: 64,
            usage: BufferUsages::UNIFORM,
        })
        .unwrap();
    let mut node = UiRenderNode::new(device.create_ui_pipelines());

    let mut ctx = GraphicsContext::new();
    ctx.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
    let mut data = DrawData::default();
    data.record(&ctx.take_commands());

    let view = ViewInput {
        view: 1,
        camera: Some(Camera {
            uniform: Some(scene_uniform),
            ..camera()
        }),
        target: Some(target),
    };
    node.execute(&mut device, &view, &mut data).unwrap();

    let view_buffer = node.view_buffer().unwrap();
    assert_ne!(view_buffer, scene_uniform);

    let view_set = device
        .commands()
        .into_iter()
        .find_map(|c| match c {
            DeviceCommand::SetResourceSet { index, set } if index == VIEW_SET => Some(set),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        device.resource_set(view_set).unwrap().entries,
        vec![ResourceBinding::UniformBuffer(view_buffer)]
    );

    let uniform: ViewUniform =
        bytemuck::pod_read_unaligned(device.buffer_contents(view_buffer).unwrap());
    let expected = Transform::ui_projection(800.0, 600.0, 2.0).to_cols_array();
    assert_eq!(uniform.view_projection, expected);
}

#[test]
fn test_render_node_skips_unready_views() {
    init_logger();
    let mut device = RecordingDevice::new();
    let target = device.create_render_target(800, 600);
    let mut node = UiRenderNode::new(device.create_ui_pipelines());
    let mut data = DrawData::default();

    let no_camera = ViewInput {
        view: 1,
        camera: None,
        target: Some(target),
    };
    assert_eq!(
        node.execute(&mut device, &no_camera, &mut data).unwrap(),
        FrameStatus::Skipped(SkipReason::MissingCamera)
    );

    let no_target = ViewInput {
        view: 1,
        camera: Some(camera()),
        target: None,
    };
    assert_eq!(
        node.execute(&mut device, &no_target, &mut data).unwrap(),
        FrameStatus::Skipped(SkipReason::MissingTarget)
    );

    assert!(device.commands().is_empty());
    assert_eq!(node.input_slots(), &["view"]);
}

#[test]
fn test_growing_frame_reallocates_buffers() {
    let mut device = RecordingDevice::new();
    let config = RendererConfig::default().initial_buffer_capacity(4);
    let mut data = DrawData::new(&config);

    let frame = |data: &mut DrawData, rects: usize| {
        let mut ctx = GraphicsContext::new();
        for i in 0..rects {
            ctx.draw_rect(Rect::new(i as f32, 0.0, 1.0, 1.0), Color::RED);
        }
        data.clear();
        data.record(&ctx.take_commands());
    };

    frame(&mut data, 1);
    data.write(&mut device).unwrap();
    let small = data.quads.vertex_buffer().unwrap();

    frame(&mut data, 1);
    data.write(&mut device).unwrap();
    assert_eq!(data.quads.vertex_buffer(), Some(small));

    frame(&mut data, 10);
    data.write(&mut device).unwrap();
    let grown = data.quads.vertex_buffer().unwrap();
    assert_ne!(grown, small);
    assert_eq!(
        device.buffer_contents(grown).unwrap().len(),
        40 * std::mem::size_of::<strata::renderer::QuadVertex>()
    );
}
