/// Terminal viewer for glkit meshes
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use glkit_core::{Camera, Mesh, RenderObject, RotationState, Settings, Transform, UniformValue};
use std::io::{stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub mod renderer;

pub use renderer::AsciiBackend;

/// Degrees turned per key press
const KEY_STEP: f32 = 5.0;

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    object: RenderObject<AsciiBackend>,
    backend: AsciiBackend,
    transform: Transform,
    camera: Camera,
    light_direction: [f32; 3],
    spin: bool,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    /// Upload `mesh` for drawing. Parts need materials to show up.
    pub fn new(mesh: Mesh, settings: &Settings) -> Result<Self> {
        let (width, height) = terminal::size().context("failed to query terminal size")?;
        // Leave the top row for the status line
        let height = height.saturating_sub(1);

        let mut backend = AsciiBackend::new(width as usize, height as usize);
        let object = RenderObject::new(&mut backend, Rc::new(mesh))?;

        let mut camera = Camera::from_settings(settings);
        camera.set_viewport(width as u32, height as u32);
        info!(
            "Viewer ready: {} parts, {} triangles",
            object.mesh().parts.len(),
            object.mesh().triangle_count()
        );

        Ok(Self {
            object,
            backend,
            transform: Transform::new().with_rotation(RotationState::new(20.0, 20.0, 0.0)),
            camera,
            light_direction: settings.light_direction,
            spin: true,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            if event::poll(Duration::from_millis(0))? {
                self.handle_input()?;
            }

            self.update();
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_input(&mut self) -> Result<()> {
        match event::read()? {
            Event::Key(KeyEvent { code, .. }) => {
                let rotation = &mut self.transform.rotation;
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => self.running = false,
                    KeyCode::Char('w') | KeyCode::Up => rotation.rotate(KEY_STEP, 0.0, 0.0),
                    KeyCode::Char('s') | KeyCode::Down => rotation.rotate(-KEY_STEP, 0.0, 0.0),
                    KeyCode::Char('a') | KeyCode::Left => rotation.rotate(0.0, -KEY_STEP, 0.0),
                    KeyCode::Char('d') | KeyCode::Right => rotation.rotate(0.0, KEY_STEP, 0.0),
                    KeyCode::Char('e') => rotation.rotate(0.0, 0.0, KEY_STEP),
                    KeyCode::Char('r') => rotation.rotate(0.0, 0.0, -KEY_STEP),
                    KeyCode::Char(' ') => self.spin = !self.spin,
                    _ => {}
                }
            }
            Event::Resize(width, height) => {
                let height = height.saturating_sub(1);
                debug!("Terminal resized to {}x{}", width, height);
                self.backend.resize(width as usize, height as usize);
                self.camera.set_viewport(width as u32, height as u32);
            }
            _ => {}
        }
        Ok(())
    }

    fn update(&mut self) {
        // Continuous slow rotation for demo effect
        if self.spin {
            self.transform.rotation.rotate(0.6, 0.9, 0.0);
        }
    }

    fn render(&mut self) -> Result<()> {
        self.object
            .set_uniform_values(self.transform.uniforms(&self.camera)?)?;
        self.object
            .set_uniform_value("ULightDirectDir", UniformValue::Vec3(self.light_direction))?;

        self.backend.clear();
        self.object.render(&mut self.backend)?;

        let mut stdout = stdout();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "GLKit Terminal Viewer | FPS: {:.1} | WASD/Arrows=Rotate E/R=Roll Space=Spin Q=Quit",
                self.fps
            )),
            ResetColor,
            cursor::MoveTo(0, 1)
        )?;
        self.backend.draw(&mut stdout)?;

        stdout.flush()?;
        Ok(())
    }
}
