//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`PbrError`] follows the failure taxonomy of the
//! renderer:
//! - Initialization failures (adapter, device, surface, window) abort startup
//! - Asset loading failures (mesh, image) abort startup
//! - Shader compilation failures leave the program unusable
//! - Incomplete framebuffers are fatal at setup
//! - Render-target cast failures are recoverable and only skip one pass
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, PbrError>`.

use thiserror::Error;

use crate::renderer::core::resources::{FramebufferStatus, Slot};

/// The main error type for the renderer.
#[derive(Error, Debug)]
pub enum PbrError {
    // ========================================================================
    // Initialization Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create the presentation surface.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(#[from] wgpu::CreateSurfaceError),

    /// The surface is not supported by the selected adapter.
    #[error("Surface not supported by adapter")]
    SurfaceUnsupported,

    /// Event loop error (winit).
    #[error("Event loop error: {0}")]
    EventLoopError(#[from] winit::error::EventLoopError),

    /// Window creation error (winit).
    #[error("Window creation failed: {0}")]
    WindowCreateFailed(#[from] winit::error::OsError),

    // ========================================================================
    // Asset Loading Errors
    // ========================================================================
    /// A mesh or image could not be loaded.
    #[error("Failed to load asset '{path}': {reason}")]
    AssetLoad {
        /// Path (or a description of the in-memory source)
        path: String,
        /// What went wrong
        reason: String,
    },

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),

    /// glTF parsing or buffer loading error.
    #[error("glTF error: {0}")]
    GltfError(String),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// A shader stage failed to preprocess, parse or validate.
    #[error("Shader compilation failed for stage '{stage}':\n{log}")]
    ShaderCompile {
        /// Stage label (usually the shader file name)
        stage: String,
        /// Compiler output
        log: String,
    },

    // ========================================================================
    // Framebuffer Errors
    // ========================================================================
    /// Framebuffer completeness check failed at setup.
    #[error("Framebuffer is not complete: {0:?}")]
    FramebufferIncomplete(FramebufferStatus),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// A render target was not backed by the expected resource type.
    #[error("Render target {slot:?} is not backed by a {expected}")]
    RuntimeCast {
        /// Attachment slot that was queried
        slot: Slot,
        /// The expected backing type
        expected: &'static str,
    },
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for PbrError {
    fn from(err: image::ImageError) -> Self {
        PbrError::ImageDecodeError(err.to_string())
    }
}

impl From<gltf::Error> for PbrError {
    fn from(err: gltf::Error) -> Self {
        PbrError::GltfError(err.to_string())
    }
}

impl PbrError {
    pub(crate) fn asset(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PbrError::AssetLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Alias for `Result<T, PbrError>`.
pub type Result<T> = std::result::Result<T, PbrError>;
