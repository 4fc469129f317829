/// GlInterop - OpenGL EXT_memory_object / EXT_semaphore entry points
///
/// Core GL calls go through the `gl` crate. The external-object EXT
/// functions are not part of its generated bindings, so they are resolved
/// here through the same loader the rendering side uses and kept as a
/// function table. Every call requires the rendering context to be current
/// on the calling thread.

use direct_display::{Error, Extent2D, NativeTexture, Result};
use direct_display::dd_error;
use gl::types::{GLenum, GLint, GLsizei, GLuint, GLuint64};
use std::ffi::c_void;

/// GL_HANDLE_TYPE_OPAQUE_FD_EXT
pub const GL_HANDLE_TYPE_OPAQUE_FD_EXT: GLenum = 0x9586;
/// GL_HANDLE_TYPE_OPAQUE_WIN32_EXT
pub const GL_HANDLE_TYPE_OPAQUE_WIN32_EXT: GLenum = 0x9587;
/// GL_LAYOUT_COLOR_ATTACHMENT_EXT
pub const GL_LAYOUT_COLOR_ATTACHMENT_EXT: GLenum = 0x958E;

type CreateMemoryObjectsFn = unsafe extern "system" fn(GLsizei, *mut GLuint);
type DeleteMemoryObjectsFn = unsafe extern "system" fn(GLsizei, *const GLuint);
type TextureStorageMem2DFn =
    unsafe extern "system" fn(GLuint, GLsizei, GLenum, GLsizei, GLsizei, GLuint, GLuint64);
type ImportMemoryWin32HandleFn = unsafe extern "system" fn(GLuint, GLuint64, GLenum, *mut c_void);
type ImportMemoryFdFn = unsafe extern "system" fn(GLuint, GLuint64, GLenum, GLint);
type GenSemaphoresFn = unsafe extern "system" fn(GLsizei, *mut GLuint);
type DeleteSemaphoresFn = unsafe extern "system" fn(GLsizei, *const GLuint);
type ImportSemaphoreWin32HandleFn = unsafe extern "system" fn(GLuint, GLenum, *mut c_void);
type ImportSemaphoreFdFn = unsafe extern "system" fn(GLuint, GLenum, GLint);
type SemaphoreOpFn = unsafe extern "system" fn(
    GLuint,
    GLuint,
    *const GLuint,
    GLuint,
    *const GLuint,
    *const GLenum,
);

const SOURCE: &str = "direct_display::gl";

/// Resolved EXT entry points
///
/// The memory-object and semaphore basics are mandatory. The per-platform
/// import functions are optional: a transport checks for the pair it needs
/// before any slot is created.
pub struct GlInterop {
    create_memory_objects: CreateMemoryObjectsFn,
    delete_memory_objects: DeleteMemoryObjectsFn,
    texture_storage_mem_2d: TextureStorageMem2DFn,
    gen_semaphores: GenSemaphoresFn,
    delete_semaphores: DeleteSemaphoresFn,
    wait_semaphore: SemaphoreOpFn,
    signal_semaphore: SemaphoreOpFn,
    import_memory_win32: Option<ImportMemoryWin32HandleFn>,
    import_memory_fd: Option<ImportMemoryFdFn>,
    import_semaphore_win32: Option<ImportSemaphoreWin32HandleFn>,
    import_semaphore_fd: Option<ImportSemaphoreFdFn>,
}

/// Resolve `name` and reinterpret it as the function pointer type `F`
///
/// # Safety
///
/// `F` must be an `extern "system"` function pointer type matching the
/// GL prototype of `name`.
unsafe fn resolve<F: Copy>(loader: &mut dyn FnMut(&str) -> *const c_void, name: &str) -> Option<F> {
    let ptr = loader(name);
    if ptr.is_null() {
        None
    } else {
        Some(std::mem::transmute_copy::<*const c_void, F>(&ptr))
    }
}

unsafe fn require<F: Copy>(loader: &mut dyn FnMut(&str) -> *const c_void, name: &str) -> Result<F> {
    resolve(loader, name).ok_or_else(|| {
        dd_error!(SOURCE, "Missing GL entry point {}", name);
        Error::InteropFailed(format!("Missing GL entry point {}", name))
    })
}

impl GlInterop {
    /// Resolve every EXT entry point through `loader`
    ///
    /// # Errors
    ///
    /// `InteropFailed` if a mandatory entry point is missing.
    pub fn load(loader: &mut dyn FnMut(&str) -> *const c_void) -> Result<Self> {
        unsafe {
            Ok(Self {
                create_memory_objects: require(loader, "glCreateMemoryObjectsEXT")?,
                delete_memory_objects: require(loader, "glDeleteMemoryObjectsEXT")?,
                texture_storage_mem_2d: require(loader, "glTextureStorageMem2DEXT")?,
                gen_semaphores: require(loader, "glGenSemaphoresEXT")?,
                delete_semaphores: require(loader, "glDeleteSemaphoresEXT")?,
                wait_semaphore: require(loader, "glWaitSemaphoreEXT")?,
                signal_semaphore: require(loader, "glSignalSemaphoreEXT")?,
                import_memory_win32: resolve(loader, "glImportMemoryWin32HandleEXT"),
                import_memory_fd: resolve(loader, "glImportMemoryFdEXT"),
                import_semaphore_win32: resolve(loader, "glImportSemaphoreWin32HandleEXT"),
                import_semaphore_fd: resolve(loader, "glImportSemaphoreFdEXT"),
            })
        }
    }

    /// Whether the Win32 handle import pair was resolved
    pub fn supports_win32_import(&self) -> bool {
        self.import_memory_win32.is_some() && self.import_semaphore_win32.is_some()
    }

    /// Whether the POSIX fd import pair was resolved
    pub fn supports_fd_import(&self) -> bool {
        self.import_memory_fd.is_some() && self.import_semaphore_fd.is_some()
    }

    // ===== MEMORY OBJECTS =====

    pub fn create_memory_object(&self) -> Result<GLuint> {
        let mut memory_object: GLuint = 0;
        unsafe {
            (self.create_memory_objects)(1, &mut memory_object);
        }
        check_error("glCreateMemoryObjectsEXT")?;
        Ok(memory_object)
    }

    pub fn delete_memory_object(&self, memory_object: GLuint) {
        unsafe {
            (self.delete_memory_objects)(1, &memory_object);
        }
    }

    pub fn import_memory_win32(&self, memory_object: GLuint, size: u64, handle: *mut c_void) -> Result<()> {
        let import = self.import_memory_win32.ok_or_else(|| missing("glImportMemoryWin32HandleEXT"))?;
        unsafe {
            import(memory_object, size, GL_HANDLE_TYPE_OPAQUE_WIN32_EXT, handle);
        }
        check_error("glImportMemoryWin32HandleEXT")
    }

    pub fn import_memory_fd(&self, memory_object: GLuint, size: u64, fd: GLint) -> Result<()> {
        let import = self.import_memory_fd.ok_or_else(|| missing("glImportMemoryFdEXT"))?;
        unsafe {
            import(memory_object, size, GL_HANDLE_TYPE_OPAQUE_FD_EXT, fd);
        }
        check_error("glImportMemoryFdEXT")
    }

    // ===== TEXTURES =====

    /// Create a single-level RGBA8 texture backed by `memory_object`
    pub fn create_texture_from_memory(&self, memory_object: GLuint, extent: Extent2D) -> Result<NativeTexture> {
        let mut texture: GLuint = 0;
        unsafe {
            gl::CreateTextures(gl::TEXTURE_2D, 1, &mut texture);
        }
        check_error("glCreateTextures")?;

        unsafe {
            (self.texture_storage_mem_2d)(
                texture,
                1,
                gl::RGBA8,
                extent.width as GLsizei,
                extent.height as GLsizei,
                memory_object,
                0,
            );
        }
        if let Err(e) = check_error("glTextureStorageMem2DEXT") {
            self.delete_texture(texture);
            return Err(e);
        }
        Ok(texture)
    }

    pub fn delete_texture(&self, texture: NativeTexture) {
        unsafe {
            gl::DeleteTextures(1, &texture);
        }
    }

    // ===== SEMAPHORES =====

    pub fn gen_semaphore(&self) -> Result<GLuint> {
        let mut semaphore: GLuint = 0;
        unsafe {
            (self.gen_semaphores)(1, &mut semaphore);
        }
        check_error("glGenSemaphoresEXT")?;
        Ok(semaphore)
    }

    pub fn delete_semaphore(&self, semaphore: GLuint) {
        unsafe {
            (self.delete_semaphores)(1, &semaphore);
        }
    }

    pub fn import_semaphore_win32(&self, semaphore: GLuint, handle: *mut c_void) -> Result<()> {
        let import = self.import_semaphore_win32.ok_or_else(|| missing("glImportSemaphoreWin32HandleEXT"))?;
        unsafe {
            import(semaphore, GL_HANDLE_TYPE_OPAQUE_WIN32_EXT, handle);
        }
        check_error("glImportSemaphoreWin32HandleEXT")
    }

    pub fn import_semaphore_fd(&self, semaphore: GLuint, fd: GLint) -> Result<()> {
        let import = self.import_semaphore_fd.ok_or_else(|| missing("glImportSemaphoreFdEXT"))?;
        unsafe {
            import(semaphore, GL_HANDLE_TYPE_OPAQUE_FD_EXT, fd);
        }
        check_error("glImportSemaphoreFdEXT")
    }

    /// Make subsequent GL work on `texture` wait for `semaphore`
    pub fn wait(&self, semaphore: GLuint, texture: NativeTexture) -> Result<()> {
        let layouts = [GL_LAYOUT_COLOR_ATTACHMENT_EXT];
        unsafe {
            (self.wait_semaphore)(semaphore, 0, std::ptr::null(), 1, &texture, layouts.as_ptr());
        }
        check_error("glWaitSemaphoreEXT")
    }

    /// Signal `semaphore` once prior GL work on `texture` completes, then flush
    /// so the signal reaches the GPU without further GL calls
    pub fn signal(&self, semaphore: GLuint, texture: NativeTexture) -> Result<()> {
        let layouts = [GL_LAYOUT_COLOR_ATTACHMENT_EXT];
        unsafe {
            (self.signal_semaphore)(semaphore, 0, std::ptr::null(), 1, &texture, layouts.as_ptr());
            gl::Flush();
        }
        check_error("glSignalSemaphoreEXT")
    }
}

fn missing(name: &str) -> Error {
    dd_error!(SOURCE, "GL entry point {} is not available", name);
    Error::InteropFailed(format!("GL entry point {} is not available", name))
}

fn check_error(call: &str) -> Result<()> {
    let code = unsafe { gl::GetError() };
    if code == gl::NO_ERROR {
        Ok(())
    } else {
        dd_error!(SOURCE, "{} failed with GL error 0x{:04X}", call, code);
        Err(Error::InteropFailed(format!("{} failed with GL error 0x{:04X}", call, code)))
    }
}
