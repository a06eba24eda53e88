use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use image::ImageReader;
use pixels::{Pixels, SurfaceTexture};
use thiserror::Error;
use tracing::debug;
use winit::window::Window;

use crate::app::scene::{MountError, RenderContainer};
use crate::model::Position;
use crate::style::MarkerShape;

use super::backend::{
    FrameView, HandleArena, ObjectHandle, RenderBackend, RenderError, RenderObjectDesc,
    ZoneOutline,
};
use super::transform::{
    position_to_point, screen_to_world, world_to_screen, Projection, Vec2, Viewport,
};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const GRID_CELL_WORLD: f64 = 10.0;
const GRID_MAJOR_EVERY: i32 = 5;
const GRID_MINOR_COLOR: [u8; 4] = [35, 39, 46, 255];
const GRID_MAJOR_COLOR: [u8; 4] = [52, 58, 70, 255];
const GRID_PERSPECTIVE_HALF_EXTENT_CELLS: i32 = 20;
const GRID_PERSPECTIVE_SEGMENTS: i32 = 8;
const PATH_COLOR: [u8; 4] = [120, 170, 255, 255];
const PATH_VERTEX_HALF_SIZE_PX: i32 = 1;
const SELECTED_HIGHLIGHT_COLOR: [u8; 4] = [80, 220, 255, 255];
const HOVER_HIGHLIGHT_COLOR: [u8; 4] = [255, 210, 70, 255];
const SELECTED_HIGHLIGHT_PAD_PX: i32 = 4;
const HOVER_HIGHLIGHT_PAD_PX: i32 = 3;
const ZONE_FILL_ALPHA: f32 = 0.18;
const LINE_CLIP_PADDING_PX: f64 = 32.0;

fn severity_color(level: u8) -> [u8; 4] {
    match level {
        0 | 1 => [230, 200, 80, 255],
        2 => [240, 140, 50, 255],
        _ => [230, 60, 60, 255],
    }
}

#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("failed to open background image {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode background image {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("background extent must have max > min on both axes")]
    EmptyExtent,
}

/// Raster map image stretched over an axis-aligned world rectangle.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    min: Vec2,
    max: Vec2,
}

impl BackgroundImage {
    pub fn load(path: &Path, min: [f64; 2], max: [f64; 2]) -> Result<Self, BackgroundError> {
        let display = path.display().to_string();
        let reader = ImageReader::open(path).map_err(|source| BackgroundError::Open {
            path: display.clone(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| BackgroundError::Decode {
            path: display,
            source,
        })?;
        let image = decoded.to_rgba8();
        Self::from_rgba(
            image.width(),
            image.height(),
            image.into_raw(),
            Vec2::new(min[0], min[1]),
            Vec2::new(max[0], max[1]),
        )
    }

    pub fn from_rgba(
        width: u32,
        height: u32,
        rgba: Vec<u8>,
        min: Vec2,
        max: Vec2,
    ) -> Result<Self, BackgroundError> {
        if !(max.x > min.x && max.y > min.y) || width == 0 || height == 0 {
            return Err(BackgroundError::EmptyExtent);
        }
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(BackgroundError::EmptyExtent);
        }
        Ok(Self {
            width,
            height,
            rgba,
            min,
            max,
        })
    }

    /// Nearest texel under a world point; image row 0 is the north edge.
    fn sample(&self, world: Vec2) -> Option<[u8; 4]> {
        if world.x < self.min.x
            || world.x >= self.max.x
            || world.y <= self.min.y
            || world.y > self.max.y
        {
            return None;
        }
        let u = (world.x - self.min.x) / (self.max.x - self.min.x);
        let v = (self.max.y - world.y) / (self.max.y - self.min.y);
        let tx = ((u * self.width as f64) as u32).min(self.width - 1);
        let ty = ((v * self.height as f64) as u32).min(self.height - 1);
        let offset = (ty as usize * self.width as usize + tx as usize) * 4;
        let texel = self.rgba.get(offset..offset + 4)?;
        Some([texel[0], texel[1], texel[2], texel[3]])
    }
}

/// Window-backed container; acquiring it builds the pixel surface.
pub struct WindowContainer {
    window: Arc<Window>,
    background: Option<BackgroundImage>,
}

impl WindowContainer {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            background: None,
        }
    }

    pub fn with_background(mut self, background: Option<BackgroundImage>) -> Self {
        self.background = background;
        self
    }
}

impl RenderContainer for WindowContainer {
    type Backend = PixelsBackend;

    fn acquire_context(self) -> Result<PixelsBackend, MountError> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(MountError::ContainerMissing(
                "window has zero inner size".to_string(),
            ));
        }
        let mut backend = PixelsBackend::new(self.window).map_err(MountError::RenderContext)?;
        backend.background = self.background;
        Ok(backend)
    }
}

/// Software rasterizer presenting through `pixels`.
pub struct PixelsBackend {
    window: Arc<Window>,
    pixels: Option<Pixels<'static>>,
    viewport: Viewport,
    objects: HandleArena<RenderObjectDesc>,
    background: Option<BackgroundImage>,
    draw_order: Vec<(ObjectHandle, Vec2, f64)>,
}

impl PixelsBackend {
    pub fn new(window: Arc<Window>) -> Result<Self, pixels::Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels = Pixels::new(size.width, size.height, surface)?;
        Ok(Self {
            window,
            pixels: Some(pixels),
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            objects: HandleArena::default(),
            background: None,
            draw_order: Vec::new(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn pixels_mut(&mut self) -> Result<&mut Pixels<'static>, RenderError> {
        self.pixels.as_mut().ok_or(RenderError::ContextReleased)
    }
}

impl RenderBackend for PixelsBackend {
    fn create_object(&mut self, desc: &RenderObjectDesc) -> Result<ObjectHandle, RenderError> {
        self.pixels_mut()?;
        Ok(self.objects.insert(desc.clone()))
    }

    fn update_object(
        &mut self,
        handle: ObjectHandle,
        desc: &RenderObjectDesc,
    ) -> Result<(), RenderError> {
        self.pixels_mut()?;
        let object = self
            .objects
            .get_mut(handle)
            .ok_or(RenderError::StaleHandle(handle))?;
        *object = desc.clone();
        Ok(())
    }

    fn destroy_object(&mut self, handle: ObjectHandle) -> Result<(), RenderError> {
        self.pixels_mut()?;
        self.objects
            .remove(handle)
            .map(|_| ())
            .ok_or(RenderError::StaleHandle(handle))
    }

    fn draw(&mut self, view: &FrameView<'_>) -> Result<(), RenderError> {
        let viewport = self.viewport;
        let pixels = self.pixels.as_mut().ok_or(RenderError::ContextReleased)?;
        rasterize_frame(
            pixels.frame_mut(),
            viewport,
            &self.objects,
            view,
            self.background.as_ref(),
            &mut self.draw_order,
        );
        pixels.render().map_err(RenderError::Present)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let pixels = self.pixels_mut()?;
        pixels
            .resize_surface(width, height)
            .map_err(RenderError::Resize)?;
        pixels
            .resize_buffer(width, height)
            .map_err(RenderError::Resize)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn release(&mut self) {
        if self.pixels.take().is_some() {
            debug!(remaining_objects = self.objects.len(), "pixels_surface_dropped");
        }
        self.objects.clear();
        self.background = None;
        self.draw_order.clear();
    }
}

/// Paints one full frame into an RGBA buffer of `viewport` size: background
/// or grid, zones, path, then markers back to front with highlights on top.
fn rasterize_frame(
    frame: &mut [u8],
    viewport: Viewport,
    objects: &HandleArena<RenderObjectDesc>,
    view: &FrameView<'_>,
    background: Option<&BackgroundImage>,
    draw_order: &mut Vec<(ObjectHandle, Vec2, f64)>,
) {
    let Viewport { width, height } = viewport;
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&CLEAR_COLOR);
    }
    if width == 0 || height == 0 {
        return;
    }

    match (view.projection, background) {
        (Projection::Plan(_), Some(background)) => {
            draw_background(frame, viewport, view.projection, background)
        }
        _ => draw_world_grid(frame, viewport, view.projection),
    }

    for zone in view.zones {
        draw_zone(frame, width, height, zone);
    }

    draw_path(frame, width, height, view.path, view.projection, viewport);

    collect_draw_order(objects, view.projection, viewport, draw_order);
    for (handle, screen, _) in draw_order.iter() {
        let Some(desc) = objects.get(*handle) else {
            continue;
        };
        let (cx, cy) = snap(*screen);
        let style = desc.style;
        draw_marker(frame, width, height, cx, cy, style.half_size_px, style.shape, style.color);
        if desc.selected {
            draw_square_outline(
                frame,
                width,
                cx,
                cy,
                style.half_size_px + SELECTED_HIGHLIGHT_PAD_PX,
                SELECTED_HIGHLIGHT_COLOR,
            );
        }
        if view.hovered == Some(*handle) {
            draw_square_outline(
                frame,
                width,
                cx,
                cy,
                style.half_size_px + HOVER_HIGHLIGHT_PAD_PX,
                HOVER_HIGHLIGHT_COLOR,
            );
        }
    }
}

/// Visible objects sorted for painting: farthest first in perspective,
/// entity id order in plan view so overlaps are stable between frames.
fn collect_draw_order(
    objects: &HandleArena<RenderObjectDesc>,
    projection: &Projection,
    viewport: Viewport,
    out: &mut Vec<(ObjectHandle, Vec2, f64)>,
) {
    out.clear();
    let eye = match projection {
        Projection::Perspective(camera) => Some(camera.eye()),
        Projection::Plan(_) => None,
    };
    for (handle, desc) in objects.iter() {
        let Some(screen) = world_to_screen(&desc.position, projection, viewport) else {
            continue;
        };
        let depth = eye
            .map(|eye| (position_to_point(&desc.position) - eye).norm())
            .unwrap_or(0.0);
        out.push((handle, screen, depth));
    }
    out.sort_by(|a, b| {
        b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal).then_with(|| {
            let left = objects.get(a.0).map(|desc| &desc.entity_id);
            let right = objects.get(b.0).map(|desc| &desc.entity_id);
            left.cmp(&right)
        })
    });
}

fn draw_background(
    frame: &mut [u8],
    viewport: Viewport,
    projection: &Projection,
    background: &BackgroundImage,
) {
    let width = viewport.width as usize;
    for y in 0..viewport.height {
        for x in 0..viewport.width {
            let screen = Vec2::new(x as f64 + 0.5, y as f64 + 0.5);
            let Some(world) = screen_to_world(screen, projection, viewport) else {
                continue;
            };
            if let Some(texel) = background.sample(world) {
                write_pixel_rgba_clipped(frame, width, x as i32, y as i32, texel);
            }
        }
    }
}

fn draw_world_grid(frame: &mut [u8], viewport: Viewport, projection: &Projection) {
    let Viewport { width, height } = viewport;
    match projection {
        Projection::Plan(camera) => {
            let (ix_start, ix_end, iy_start, iy_end) =
                visible_grid_index_bounds(camera.position, width, height, camera.scale());
            for ix in ix_start..=ix_end {
                let world_x = ix as f64 * GRID_CELL_WORLD;
                let Some(screen) = world_to_screen(
                    &Position::planar(world_x, camera.position.y),
                    projection,
                    viewport,
                ) else {
                    continue;
                };
                draw_vertical_line_clipped(frame, width, height, snap(screen).0, grid_color(ix));
            }
            for iy in iy_start..=iy_end {
                let world_y = iy as f64 * GRID_CELL_WORLD;
                let Some(screen) = world_to_screen(
                    &Position::planar(camera.position.x, world_y),
                    projection,
                    viewport,
                ) else {
                    continue;
                };
                draw_horizontal_line_clipped(frame, width, height, snap(screen).1, grid_color(iy));
            }
        }
        Projection::Perspective(camera) => {
            let center_x = (camera.target.x / GRID_CELL_WORLD).round() as i32;
            let center_y = (camera.target.y / GRID_CELL_WORLD).round() as i32;
            let extent = GRID_PERSPECTIVE_HALF_EXTENT_CELLS;
            let span = |center: i32| {
                (
                    (center - extent) as f64 * GRID_CELL_WORLD,
                    (center + extent) as f64 * GRID_CELL_WORLD,
                )
            };
            let (x_min, x_max) = span(center_x);
            let (y_min, y_max) = span(center_y);
            for i in -extent..=extent {
                let ix = center_x + i;
                let x = ix as f64 * GRID_CELL_WORLD;
                let color = grid_color(ix);
                draw_ground_line(frame, viewport, projection, (x, y_min), (x, y_max), color);
                let iy = center_y + i;
                let y = iy as f64 * GRID_CELL_WORLD;
                let color = grid_color(iy);
                draw_ground_line(frame, viewport, projection, (x_min, y), (x_max, y), color);
            }
        }
    }
}

fn grid_color(index: i32) -> [u8; 4] {
    if is_major_index(index) {
        GRID_MAJOR_COLOR
    } else {
        GRID_MINOR_COLOR
    }
}

/// Ground-plane line split into short segments so the parts behind the
/// camera can be dropped without discarding the whole line.
fn draw_ground_line(
    frame: &mut [u8],
    viewport: Viewport,
    projection: &Projection,
    from: (f64, f64),
    to: (f64, f64),
    color: [u8; 4],
) {
    let point_at = |t: f64| {
        let x = from.0 + (to.0 - from.0) * t;
        let y = from.1 + (to.1 - from.1) * t;
        world_to_screen(&Position::planar(x, y), projection, viewport)
    };
    let mut previous = point_at(0.0);
    for segment in 1..=GRID_PERSPECTIVE_SEGMENTS {
        let current = point_at(segment as f64 / GRID_PERSPECTIVE_SEGMENTS as f64);
        if let (Some(a), Some(b)) = (previous, current) {
            draw_line(frame, viewport.width, viewport.height, a, b, color);
        }
        previous = current;
    }
}

fn visible_grid_index_bounds(
    camera_pos: Vec2,
    width: u32,
    height: u32,
    pixels_per_world: f64,
) -> (i32, i32, i32, i32) {
    let pixels_per_world = if pixels_per_world.is_finite() && pixels_per_world > 0.0 {
        pixels_per_world
    } else {
        1.0
    };
    let half_w_world = width as f64 / (2.0 * pixels_per_world);
    let half_h_world = height as f64 / (2.0 * pixels_per_world);
    let min_x = camera_pos.x - half_w_world;
    let max_x = camera_pos.x + half_w_world;
    let min_y = camera_pos.y - half_h_world;
    let max_y = camera_pos.y + half_h_world;

    let ix_start = (min_x / GRID_CELL_WORLD).floor() as i32 - 1;
    let ix_end = (max_x / GRID_CELL_WORLD).ceil() as i32 + 1;
    let iy_start = (min_y / GRID_CELL_WORLD).floor() as i32 - 1;
    let iy_end = (max_y / GRID_CELL_WORLD).ceil() as i32 + 1;
    (ix_start, ix_end, iy_start, iy_end)
}

fn is_major_index(idx: i32) -> bool {
    idx.rem_euclid(GRID_MAJOR_EVERY) == 0
}

fn draw_zone(frame: &mut [u8], width: u32, height: u32, zone: &ZoneOutline) {
    let color = severity_color(zone.severity_level);
    if zone.occupied {
        fill_polygon_blended(frame, width, height, &zone.vertices, color, ZONE_FILL_ALPHA);
    }
    let count = zone.vertices.len();
    for (index, vertex) in zone.vertices.iter().enumerate() {
        let next = zone.vertices[(index + 1) % count];
        draw_line(frame, width, height, *vertex, next, color);
    }
}

fn draw_path(
    frame: &mut [u8],
    width: u32,
    height: u32,
    path: &[Position],
    projection: &Projection,
    viewport: Viewport,
) {
    let mut previous: Option<Vec2> = None;
    for position in path {
        let current = world_to_screen(position, projection, viewport);
        if let (Some(a), Some(b)) = (previous, current) {
            draw_line(frame, width, height, a, b, PATH_COLOR);
        }
        if let Some(point) = current {
            let (cx, cy) = snap(point);
            draw_square(frame, width, height, cx, cy, PATH_VERTEX_HALF_SIZE_PX, PATH_COLOR);
        }
        previous = current;
    }
}

fn snap(screen: Vec2) -> (i32, i32) {
    (screen.x.round() as i32, screen.y.round() as i32)
}

fn draw_vertical_line_clipped(frame: &mut [u8], width: u32, height: u32, x: i32, color: [u8; 4]) {
    if width == 0 || height == 0 || x < 0 || x >= width as i32 {
        return;
    }
    for y in 0..height as i32 {
        write_pixel_rgba_clipped(frame, width as usize, x, y, color);
    }
}

fn draw_horizontal_line_clipped(frame: &mut [u8], width: u32, height: u32, y: i32, color: [u8; 4]) {
    if width == 0 || height == 0 || y < 0 || y >= height as i32 {
        return;
    }
    for x in 0..width as i32 {
        write_pixel_rgba_clipped(frame, width as usize, x, y, color);
    }
}

fn pixel_offset(frame_len: usize, width: usize, x: i32, y: i32) -> Option<usize> {
    if x < 0 || y < 0 || x as usize >= width {
        return None;
    }
    let byte_offset = (y as usize)
        .checked_mul(width)?
        .checked_add(x as usize)?
        .checked_mul(4)?;
    (byte_offset.checked_add(4)? <= frame_len).then_some(byte_offset)
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if let Some(offset) = pixel_offset(frame.len(), width, x, y) {
        frame[offset..offset + 4].copy_from_slice(&color);
    }
}

fn blend_pixel_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4], alpha: f32) {
    let Some(offset) = pixel_offset(frame.len(), width, x, y) else {
        return;
    };
    for channel in 0..3 {
        let dst = f32::from(frame[offset + channel]);
        let src = f32::from(color[channel]);
        frame[offset + channel] = (dst + (src - dst) * alpha).round().clamp(0.0, 255.0) as u8;
    }
}

/// Liang-Barsky clip of a segment against the padded viewport.
fn clip_segment(a: Vec2, b: Vec2, width: u32, height: u32) -> Option<(Vec2, Vec2)> {
    let min_x = -LINE_CLIP_PADDING_PX;
    let min_y = -LINE_CLIP_PADDING_PX;
    let max_x = width as f64 + LINE_CLIP_PADDING_PX;
    let max_y = height as f64 + LINE_CLIP_PADDING_PX;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-dx, a.x - min_x),
        (dx, max_x - a.x),
        (-dy, a.y - min_y),
        (dy, max_y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        Vec2::new(a.x + dx * t0, a.y + dy * t0),
        Vec2::new(a.x + dx * t1, a.y + dy * t1),
    ))
}

fn draw_line(frame: &mut [u8], width: u32, height: u32, a: Vec2, b: Vec2, color: [u8; 4]) {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return;
    }
    let Some((a, b)) = clip_segment(a, b, width, height) else {
        return;
    };
    let (mut x0, mut y0) = snap(a);
    let (x1, y1) = snap(b);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        write_pixel_rgba_clipped(frame, width as usize, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Even-odd scanline fill sampled at pixel centers.
fn fill_polygon_blended(
    frame: &mut [u8],
    width: u32,
    height: u32,
    vertices: &[Vec2],
    color: [u8; 4],
    alpha: f32,
) {
    if vertices.len() < 3 {
        return;
    }
    let min_y = vertices.iter().map(|v| v.y).fold(f64::INFINITY, f64::min);
    let max_y = vertices.iter().map(|v| v.y).fold(f64::NEG_INFINITY, f64::max);
    if !min_y.is_finite() || !max_y.is_finite() {
        return;
    }
    let y_start = (min_y.floor() as i64).max(0);
    let y_end = (max_y.ceil() as i64).min(height as i64 - 1);
    let mut crossings = Vec::new();
    for y in y_start..=y_end {
        let scan_y = y as f64 + 0.5;
        crossings.clear();
        for (index, a) in vertices.iter().enumerate() {
            let b = vertices[(index + 1) % vertices.len()];
            if (a.y > scan_y) != (b.y > scan_y) {
                crossings.push(a.x + (scan_y - a.y) / (b.y - a.y) * (b.x - a.x));
            }
        }
        crossings.sort_by(|l, r| l.partial_cmp(r).unwrap_or(Ordering::Equal));
        for pair in crossings.chunks_exact(2) {
            let x_start = ((pair[0] - 0.5).ceil() as i64).max(0);
            let x_end = ((pair[1] - 0.5).floor() as i64).min(width as i64 - 1);
            for x in x_start..=x_end {
                blend_pixel_clipped(frame, width as usize, x as i32, y as i32, color, alpha);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_marker(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    shape: MarkerShape,
    color: [u8; 4],
) {
    match shape {
        MarkerShape::Square => draw_square(frame, width, height, cx, cy, half_size, color),
        MarkerShape::Diamond => {
            fill_centered(frame, width, height, cx, cy, half_size, color, |dx, dy| {
                dx.abs() + dy.abs() <= half_size
            })
        }
        MarkerShape::Circle => {
            fill_centered(frame, width, height, cx, cy, half_size, color, |dx, dy| {
                dx * dx + dy * dy <= half_size * half_size
            })
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_centered(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
    inside: impl Fn(i32, i32) -> bool,
) {
    for dy in -half_size..=half_size {
        for dx in -half_size..=half_size {
            let (x, y) = (cx + dx, cy + dy);
            if y >= height as i32 || !inside(dx, dy) {
                continue;
            }
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

fn draw_square(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    fill_centered(frame, width, height, cx, cy, half_size, color, |_, _| true);
}

fn draw_square_outline(
    frame: &mut [u8],
    width: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    let left = cx - half_size;
    let right = cx + half_size;
    let top = cy - half_size;
    let bottom = cy + half_size;

    for x in left..=right {
        write_pixel_rgba_clipped(frame, width as usize, x, top, color);
        write_pixel_rgba_clipped(frame, width as usize, x, bottom, color);
    }
    for y in top..=bottom {
        write_pixel_rgba_clipped(frame, width as usize, left, y, color);
        write_pixel_rgba_clipped(frame, width as usize, right, y, color);
    }
}
