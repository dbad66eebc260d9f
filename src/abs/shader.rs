//! OpenGL Shaders
//!
//! This module defines the [`Shader`] and [`ShaderProgram`] structs for compiling and linking
//! OpenGL shaders. A [`ShaderProgram`] only exists once both of its shaders compiled and the link
//! succeeded, so anything that draws with one never sees an unusable program.
//!
//! Driver calls go through the [`ShaderBackend`] trait, which is implemented for
//! [`glow::Context`].

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glow::HasContext;

/// The pipeline stage a shader is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Returns the matching OpenGL shader type enum.
    pub fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors produced while loading, compiling or linking shaders.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read {stage} shader {}: {source}", .path.display())]
    Read {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create {what}: {reason}")]
    Create { what: &'static str, reason: String },
    #[error("{stage} shader {origin} failed to compile")]
    Compile {
        stage: ShaderStage,
        origin: String,
        log: String,
    },
    #[error("shader program failed to link")]
    Link { log: String },
    #[error("expected a {expected} shader, got a {found} shader")]
    StageMismatch {
        expected: ShaderStage,
        found: ShaderStage,
    },
}

/// Source text for a single shader compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    stage: ShaderStage,
    origin: String,
    text: Cow<'static, str>,
}

impl ShaderSource {
    /// Creates a source from owned or borrowed text, labelled with `origin` in diagnostics.
    pub fn new(stage: ShaderStage, origin: impl Into<String>, text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            stage,
            origin: origin.into(),
            text: text.into(),
        }
    }

    /// Creates a source from text compiled into the binary.
    pub fn inline(stage: ShaderStage, text: &'static str) -> Self {
        Self::new(stage, "<inline>", text)
    }

    /// Reads a source from a file on disk.
    pub fn from_file(stage: ShaderStage, path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
            stage,
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(stage, path.display().to_string(), text))
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The driver entry points the shader builder needs.
///
/// All methods assume the backend's context is current on the calling thread.
pub trait ShaderBackend {
    type Shader: Copy + Eq + fmt::Debug;
    type Program: Copy + Eq + fmt::Debug;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
}

impl ShaderBackend for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { HasContext::create_shader(self, stage.gl_enum()) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { HasContext::shader_source(self, shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::compile_shader(self, shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }
}

/// Represents an individual compiled OpenGL shader.
pub struct Shader<B: ShaderBackend = glow::Context> {
    gl: Arc<B>,
    id: B::Shader,
    stage: ShaderStage,
}

impl<B: ShaderBackend> Shader<B> {
    /// Compiles a new shader from the given source.
    ///
    /// On failure the driver's info log is logged and returned in the error, and the shader
    /// object is deleted.
    pub fn compile(gl: &Arc<B>, source: &ShaderSource) -> Result<Self, ShaderError> {
        let stage = source.stage();
        let id = gl.create_shader(stage).map_err(|reason| ShaderError::Create {
            what: "shader object",
            reason,
        })?;

        gl.shader_source(id, source.text());
        gl.compile_shader(id);

        if !gl.shader_compile_status(id) {
            let log = gl.shader_info_log(id);
            gl.delete_shader(id);
            log::error!("{stage} shader {} failed to compile:\n{}", source.origin(), log.trim_end());
            return Err(ShaderError::Compile {
                stage,
                origin: source.origin().to_owned(),
                log,
            });
        }

        log::debug!("compiled {stage} shader {}", source.origin());
        Ok(Self {
            gl: Arc::clone(gl),
            id,
            stage,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl<B: ShaderBackend> Drop for Shader<B> {
    fn drop(&mut self) {
        self.gl.delete_shader(self.id);
    }
}

/// Represents a linked OpenGL shader program made of one vertex and one fragment shader.
pub struct ShaderProgram<B: ShaderBackend = glow::Context> {
    gl: Arc<B>,
    id: B::Program,
}

impl<B: ShaderBackend> ShaderProgram<B> {
    /// Links a new shader program from the given shaders.
    ///
    /// The shaders are consumed: they are released once the link has been attempted, whether it
    /// succeeded or not.
    pub fn link(gl: &Arc<B>, vertex: Shader<B>, fragment: Shader<B>) -> Result<Self, ShaderError> {
        for (shader, expected) in [(&vertex, ShaderStage::Vertex), (&fragment, ShaderStage::Fragment)] {
            if shader.stage() != expected {
                return Err(ShaderError::StageMismatch {
                    expected,
                    found: shader.stage(),
                });
            }
        }

        let program = gl.create_program().map_err(|reason| ShaderError::Create {
            what: "program object",
            reason,
        })?;

        gl.attach_shader(program, vertex.id);
        gl.attach_shader(program, fragment.id);
        gl.link_program(program);
        let linked = gl.program_link_status(program);
        gl.detach_shader(program, vertex.id);
        gl.detach_shader(program, fragment.id);

        if !linked {
            let log = gl.program_info_log(program);
            gl.delete_program(program);
            log::error!("shader program failed to link:\n{}", log.trim_end());
            return Err(ShaderError::Link { log });
        }

        log::debug!("linked shader program {program:?}");
        Ok(Self {
            gl: Arc::clone(gl),
            id: program,
        })
    }

    /// Compiles both sources and links them.
    ///
    /// Both sources are always compiled so that every diagnostic gets logged; the first error is
    /// returned.
    pub fn build(gl: &Arc<B>, vertex: &ShaderSource, fragment: &ShaderSource) -> Result<Self, ShaderError> {
        let vertex = Shader::compile(gl, vertex);
        let fragment = Shader::compile(gl, fragment);
        Self::link(gl, vertex?, fragment?)
    }

    /// Binds the shader program for use.
    ///
    /// The program stays bound until the returned guard is dropped.
    #[must_use = "the program is unbound when the guard is dropped"]
    pub fn use_program(&self) -> BoundProgram<'_, B> {
        self.gl.use_program(Some(self.id));
        BoundProgram { program: self }
    }

    pub fn id(&self) -> B::Program {
        self.id
    }
}

impl<B: ShaderBackend> Drop for ShaderProgram<B> {
    fn drop(&mut self) {
        self.gl.delete_program(self.id);
    }
}

/// A [`ShaderProgram`] that is currently the active program.
pub struct BoundProgram<'a, B: ShaderBackend = glow::Context> {
    program: &'a ShaderProgram<B>,
}

impl<B: ShaderBackend> BoundProgram<'_, B> {
    pub fn program(&self) -> &ShaderProgram<B> {
        self.program
    }
}

impl<B: ShaderBackend> Drop for BoundProgram<'_, B> {
    fn drop(&mut self) {
        self.program.gl.use_program(None);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use super::*;

    /// A fake driver that "compiles" sources with a caller-supplied rule and records every
    /// object it creates and deletes.
    struct FakeBackend {
        compiles: fn(ShaderStage, &str) -> Option<String>,
        fail_link: bool,
        state: RefCell<FakeState>,
    }

    #[derive(Default)]
    struct FakeState {
        next_id: u32,
        shaders: HashMap<u32, (ShaderStage, String, bool)>,
        programs: HashMap<u32, Vec<u32>>,
        linked: HashSet<u32>,
        deleted_shaders: Vec<u32>,
        deleted_programs: Vec<u32>,
        current: Option<u32>,
    }

    /// Fails any source that has a statement missing its semicolon before a closing brace.
    fn missing_semicolon(stage: ShaderStage, source: &str) -> Option<String> {
        let mut previous = "";
        for (number, line) in source.lines().enumerate() {
            let line = line.trim();
            if line == "}" && !previous.is_empty() && !previous.ends_with(';') && !previous.ends_with('{') {
                return Some(format!("ERROR: 0:{}: '}}' : syntax error ({stage})\n", number + 1));
            }
            if !line.is_empty() {
                previous = line;
            }
        }
        None
    }

    impl FakeBackend {
        fn new(compiles: fn(ShaderStage, &str) -> Option<String>) -> Arc<Self> {
            Arc::new(Self {
                compiles,
                fail_link: false,
                state: RefCell::default(),
            })
        }

        fn failing_link() -> Arc<Self> {
            Arc::new(Self {
                compiles: missing_semicolon,
                fail_link: true,
                state: RefCell::default(),
            })
        }

        fn state(&self) -> std::cell::Ref<'_, FakeState> {
            self.state.borrow()
        }

        fn next_id(&self) -> u32 {
            let mut state = self.state.borrow_mut();
            state.next_id += 1;
            state.next_id
        }
    }

    impl ShaderBackend for FakeBackend {
        type Shader = u32;
        type Program = u32;

        fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
            let id = self.next_id();
            self.state.borrow_mut().shaders.insert(id, (stage, String::new(), false));
            Ok(id)
        }

        fn shader_source(&self, shader: u32, source: &str) {
            if let Some(entry) = self.state.borrow_mut().shaders.get_mut(&shader) {
                entry.1 = source.to_owned();
            }
        }

        fn compile_shader(&self, shader: u32) {
            let mut state = self.state.borrow_mut();
            if let Some(entry) = state.shaders.get_mut(&shader) {
                entry.2 = (self.compiles)(entry.0, &entry.1).is_none();
            }
        }

        fn shader_compile_status(&self, shader: u32) -> bool {
            self.state.borrow().shaders.get(&shader).is_some_and(|entry| entry.2)
        }

        fn shader_info_log(&self, shader: u32) -> String {
            let state = self.state.borrow();
            state
                .shaders
                .get(&shader)
                .and_then(|(stage, source, _)| (self.compiles)(*stage, source))
                .unwrap_or_default()
        }

        fn delete_shader(&self, shader: u32) {
            self.state.borrow_mut().deleted_shaders.push(shader);
        }

        fn create_program(&self) -> Result<u32, String> {
            let id = self.next_id();
            self.state.borrow_mut().programs.insert(id, Vec::new());
            Ok(id)
        }

        fn attach_shader(&self, program: u32, shader: u32) {
            if let Some(attached) = self.state.borrow_mut().programs.get_mut(&program) {
                attached.push(shader);
            }
        }

        fn detach_shader(&self, program: u32, shader: u32) {
            if let Some(attached) = self.state.borrow_mut().programs.get_mut(&program) {
                attached.retain(|&id| id != shader);
            }
        }

        fn link_program(&self, program: u32) {
            let mut state = self.state.borrow_mut();
            let Some(attached) = state.programs.get(&program) else {
                return;
            };
            let stages: HashSet<ShaderStage> = attached
                .iter()
                .filter_map(|id| state.shaders.get(id))
                .filter(|entry| entry.2)
                .map(|entry| entry.0)
                .collect();
            if !self.fail_link && stages.len() == 2 {
                state.linked.insert(program);
            }
        }

        fn program_link_status(&self, program: u32) -> bool {
            self.state.borrow().linked.contains(&program)
        }

        fn program_info_log(&self, program: u32) -> String {
            if self.program_link_status(program) {
                String::new()
            } else {
                "error: no main() in fragment shader\n".to_owned()
            }
        }

        fn delete_program(&self, program: u32) {
            self.state.borrow_mut().deleted_programs.push(program);
        }

        fn use_program(&self, program: Option<u32>) {
            self.state.borrow_mut().current = program;
        }
    }

    const VERTEX: &str = "#version 330 core\nlayout (location = 0) in vec3 aPos;\nvoid main() {\n    gl_Position = vec4(aPos, 1.0);\n}\n";
    const FRAGMENT: &str = "#version 330 core\nout vec4 FragColor;\nvoid main() {\n    FragColor = vec4(1.0, 0.5, 0.2, 1.0);\n}\n";
    const BROKEN_FRAGMENT: &str = "#version 330 core\nout vec4 FragColor;\nvoid main() {\n    FragColor = vec4(1.0, 0.5, 0.2, 1.0)\n}\n";

    fn vertex() -> ShaderSource {
        ShaderSource::inline(ShaderStage::Vertex, VERTEX)
    }

    fn fragment() -> ShaderSource {
        ShaderSource::inline(ShaderStage::Fragment, FRAGMENT)
    }

    #[test]
    fn valid_sources_link_and_release_both_shaders() {
        let gl = FakeBackend::new(missing_semicolon);
        let vs = Shader::compile(&gl, &vertex()).unwrap();
        let fs = Shader::compile(&gl, &fragment()).unwrap();
        let (vs_id, fs_id) = (vs.id, fs.id);

        let program = ShaderProgram::link(&gl, vs, fs).unwrap();

        let state = gl.state();
        assert!(state.linked.contains(&program.id()));
        assert!(state.deleted_shaders.contains(&vs_id));
        assert!(state.deleted_shaders.contains(&fs_id));
        assert!(state.programs[&program.id()].is_empty());
        assert!(state.deleted_programs.is_empty());
    }

    #[test]
    fn failed_link_still_releases_both_shaders() {
        let gl = FakeBackend::failing_link();
        let vs = Shader::compile(&gl, &vertex()).unwrap();
        let fs = Shader::compile(&gl, &fragment()).unwrap();
        let (vs_id, fs_id) = (vs.id, fs.id);

        let err = ShaderProgram::link(&gl, vs, fs).err().unwrap();

        assert!(matches!(err, ShaderError::Link { ref log } if !log.is_empty()));
        assert_eq!(err.to_string(), "shader program failed to link");
        let state = gl.state();
        assert!(state.deleted_shaders.contains(&vs_id));
        assert!(state.deleted_shaders.contains(&fs_id));
        assert_eq!(state.deleted_programs.len(), 1);
    }

    #[test]
    fn syntax_error_reports_non_empty_diagnostic() {
        let gl = FakeBackend::new(missing_semicolon);
        let source = ShaderSource::inline(ShaderStage::Fragment, BROKEN_FRAGMENT);

        let err = Shader::compile(&gl, &source).err().unwrap();

        match err {
            ShaderError::Compile { stage, ref origin, ref log } => {
                assert_eq!(err.to_string(), "fragment shader <inline> failed to compile");
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(origin, "<inline>");
                assert!(log.contains("syntax error"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // The failed shader object is released right away.
        assert_eq!(gl.state().deleted_shaders.len(), 1);
    }

    #[test]
    fn build_compiles_both_stages_before_reporting() {
        let gl = FakeBackend::new(|_, _| Some("ERROR: 0:1: syntax error\n".to_owned()));

        let err = ShaderProgram::build(&gl, &vertex(), &fragment()).err().unwrap();

        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
        let state = gl.state();
        assert_eq!(state.shaders.len(), 2);
        assert_eq!(state.deleted_shaders.len(), 2);
        assert!(state.programs.is_empty());
    }

    #[test]
    fn broken_fragment_leaves_no_program() {
        let gl = FakeBackend::new(missing_semicolon);
        let broken = ShaderSource::inline(ShaderStage::Fragment, BROKEN_FRAGMENT);

        let result = ShaderProgram::build(&gl, &vertex(), &broken);

        assert!(matches!(result, Err(ShaderError::Compile { stage: ShaderStage::Fragment, .. })));
        let state = gl.state();
        assert!(state.programs.is_empty());
        // The vertex shader compiled, and was released along with the failed fragment shader.
        assert_eq!(state.deleted_shaders.len(), 2);
    }

    #[test]
    fn swapped_stages_are_rejected() {
        let gl = FakeBackend::new(missing_semicolon);
        let vs = Shader::compile(&gl, &vertex()).unwrap();
        let fs = Shader::compile(&gl, &fragment()).unwrap();

        let err = ShaderProgram::link(&gl, fs, vs).err().unwrap();

        assert!(matches!(
            err,
            ShaderError::StageMismatch {
                expected: ShaderStage::Vertex,
                found: ShaderStage::Fragment
            }
        ));
        assert!(gl.state().programs.is_empty());
        assert_eq!(gl.state().deleted_shaders.len(), 2);
    }

    #[test]
    fn use_program_binds_until_guard_drops() {
        let gl = FakeBackend::new(missing_semicolon);
        let program = ShaderProgram::build(&gl, &vertex(), &fragment()).unwrap();

        {
            let bound = program.use_program();
            assert_eq!(gl.state().current, Some(bound.program().id()));
        }
        assert_eq!(gl.state().current, None);

        let id = program.id();
        drop(program);
        assert_eq!(gl.state().deleted_programs, vec![id]);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ShaderSource::from_file(ShaderStage::Vertex, "does/not/exist.glsl").unwrap_err();
        assert!(matches!(err, ShaderError::Read { stage: ShaderStage::Vertex, .. }));
        assert!(err.to_string().contains("does/not/exist.glsl"));
    }

    #[test]
    fn file_source_uses_path_as_origin() {
        let path = std::env::temp_dir().join(format!("hello-triangle-{}.glsl", std::process::id()));
        std::fs::write(&path, VERTEX).unwrap();

        let source = ShaderSource::from_file(ShaderStage::Vertex, &path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(source.text(), VERTEX);
        assert_eq!(source.origin(), path.display().to_string());
        assert_eq!(source.stage(), ShaderStage::Vertex);
    }
}
