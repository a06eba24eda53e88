mod backend;
mod recording;
mod renderer;
mod transform;

pub use backend::{
    FrameView, HandleArena, ObjectHandle, RenderBackend, RenderError, RenderObjectDesc,
    ZoneOutline,
};
pub use recording::{BackendCall, RecordingBackend, RecordingLog};
pub use renderer::{BackgroundError, BackgroundImage, PixelsBackend, WindowContainer};
pub use transform::{
    pick_ray, position_to_point, screen_to_world, world_to_screen, Camera2D, Camera3D, Projection,
    Vec2, Viewport, CAMERA_ZOOM_DEFAULT, DEFAULT_PIXELS_PER_UNIT,
};
