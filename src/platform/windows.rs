//! Windows implementation of the platform seam.
//!
//! Surfaces are the visible top-level windows of the current process (the
//! main window plus any owned dialogs or popups), discovered with
//! `EnumWindows`. Pixels are read through the Windows Graphics Capture API:
//! a per-window capture session renders into a Direct3D 11 frame pool and a
//! staging texture brings the frame back to the CPU.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use image::{ImageBuffer, Rgba, RgbaImage};
use log::{debug, warn};

use windows::Foundation::TypedEventHandler;
use windows::Graphics::Capture::{Direct3D11CaptureFramePool, GraphicsCaptureItem};
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING, D3D11CreateDevice, ID3D11Device,
    ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
};
use windows::Win32::System::Threading::GetCurrentProcessId;
use windows::Win32::System::WinRT::Direct3D11::CreateDirect3D11DeviceFromDXGIDevice;
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;
use windows::Win32::System::WinRT::{RO_INIT_MULTITHREADED, RoInitialize};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumChildWindows, EnumWindows, GWLP_HWNDPARENT, GetWindowLongPtrW, GetWindowRect,
    GetWindowThreadProcessId, IsWindowVisible,
};
use windows::core::Interface;

use crate::geometry::Rect;
use crate::platform::{
    CaptureSink, OwnerToken, RawSurface, SurfaceHandle, SurfaceNode, SurfaceProvider,
};
use crate::surface::SurfaceKind;

/// How long one capture waits for its first frame before giving up. The
/// pipeline-level timeout still applies on top.
const FRAME_WAIT: Duration = Duration::from_secs(5);

/// Surface provider backed by Win32 window enumeration and the Windows
/// Graphics Capture API.
#[derive(Debug, Default)]
pub struct WindowsSurfaceProvider;

impl WindowsSurfaceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl SurfaceProvider for WindowsSurfaceProvider {
    fn list_visible_surfaces(&self) -> Vec<RawSurface> {
        enumerate_process_windows()
    }

    fn request_capture(&self, surface: &crate::surface::WindowSurface, done: CaptureSink) {
        // HWND is not Send; carry the raw handle value across the thread
        // boundary and rebuild it on the worker.
        let raw_hwnd = surface.handle.0;
        thread::spawn(move || {
            // Each worker needs a WinRT apartment; a second init on an
            // already-initialized thread is harmless.
            unsafe {
                let _ = RoInitialize(RO_INIT_MULTITHREADED);
            }
            match capture_window(HWND(raw_hwnd as usize as *mut std::ffi::c_void)) {
                Ok(bitmap) => done(Some(bitmap)),
                Err(e) => {
                    warn!("capture of window {raw_hwnd:#x} failed: {e:#}");
                    done(None);
                }
            }
        });
    }
}

/// Lists the visible top-level windows of the current process, bottom-most
/// first. A window without an owner is the primary surface; owned windows
/// are overlays keyed to their owner.
fn enumerate_process_windows() -> Vec<RawSurface> {
    struct EnumData {
        process_id: u32,
        surfaces: Vec<RawSurface>,
    }

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let data = &mut *(lparam.0 as *mut EnumData);

            if !IsWindowVisible(hwnd).as_bool() {
                return TRUE;
            }

            let mut process_id: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut process_id));
            if process_id != data.process_id {
                return TRUE;
            }

            let Ok(frame) = window_rect(hwnd) else {
                warn!("failed to read rect of window {:?}, skipping", hwnd);
                return TRUE;
            };

            let owner = GetWindowLongPtrW(hwnd, GWLP_HWNDPARENT);
            let (kind, owner_token) = if owner == 0 {
                // Top-level unowned window: the primary surface. Its own
                // handle doubles as the token its overlays point at.
                (SurfaceKind::Primary, Some(OwnerToken(hwnd.0 as u64)))
            } else {
                (SurfaceKind::Overlay, Some(OwnerToken(owner as u64)))
            };

            data.surfaces.push(RawSurface {
                handle: SurfaceHandle(hwnd.0 as u64),
                kind,
                visible: true,
                frame,
                // Win32 records no scrim metadata for owned windows.
                dim_amount: 0.0,
                owner_token,
                content: Some(content_tree(hwnd, frame)),
            });

            TRUE
        }
    }

    let mut data = EnumData {
        process_id: unsafe { GetCurrentProcessId() },
        surfaces: Vec::new(),
    };

    unsafe {
        if let Err(e) = EnumWindows(Some(enum_callback), LPARAM(&mut data as *mut _ as isize)) {
            warn!("window enumeration failed: {e}");
            return Vec::new();
        }
    }

    // EnumWindows reports top-down; compositing draws bottom-up.
    data.surfaces.reverse();
    debug!("found {} process window(s)", data.surfaces.len());
    data.surfaces
}

/// Content tree for one window: the window itself with its direct children,
/// enough for the enumerator to spot a child positioned well below the top
/// of the screen.
fn content_tree(hwnd: HWND, frame: Rect) -> SurfaceNode {
    struct ChildData {
        children: Vec<SurfaceNode>,
    }

    unsafe extern "system" fn child_callback(child: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let data = &mut *(lparam.0 as *mut ChildData);
            if let Ok(frame) = window_rect(child) {
                data.children.push(SurfaceNode {
                    frame,
                    visible: IsWindowVisible(child).as_bool(),
                    children: Vec::new(),
                });
            }
            TRUE
        }
    }

    let mut data = ChildData { children: Vec::new() };
    unsafe {
        let _ = EnumChildWindows(
            hwnd,
            Some(child_callback),
            LPARAM(&mut data as *mut _ as isize),
        );
    }

    SurfaceNode {
        frame,
        visible: true,
        children: data.children,
    }
}

fn window_rect(hwnd: HWND) -> Result<Rect> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect)? };
    Ok(Rect {
        left: rect.left,
        top: rect.top,
        right: rect.right,
        bottom: rect.bottom,
    })
}

/// Captures one frame of the window through the Windows Graphics Capture
/// API and converts it from BGRA to RGBA.
fn capture_window(hwnd: HWND) -> Result<RgbaImage> {
    let (device, context) = create_d3d11_device()?;
    let item = create_capture_item(hwnd)?;
    let size = item.Size()?;
    if size.Width <= 0 || size.Height <= 0 {
        return Err(anyhow!("window has no capturable area"));
    }

    let d3d_device = create_direct3d_device(&device)?;
    let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
        &d3d_device,
        DirectXPixelFormat::B8G8R8A8UIntNormalized,
        1,
        size,
    )?;
    let session = frame_pool.CreateCaptureSession(&item)?;

    let frame_arrived = Arc::new(AtomicBool::new(false));
    let frame_flag = frame_arrived.clone();
    frame_pool.FrameArrived(&TypedEventHandler::new(
        move |_pool: &Option<Direct3D11CaptureFramePool>, _| {
            frame_flag.store(true, Ordering::SeqCst);
            Ok(())
        },
    ))?;

    session.StartCapture()?;

    let start = Instant::now();
    while !frame_arrived.load(Ordering::SeqCst) {
        if start.elapsed() > FRAME_WAIT {
            session.Close()?;
            frame_pool.Close()?;
            return Err(anyhow!("timeout waiting for capture frame"));
        }
        thread::sleep(Duration::from_millis(10));
    }

    let frame = frame_pool.TryGetNextFrame()?;
    let surface = frame.Surface()?;

    let access: windows::Win32::System::WinRT::Direct3D11::IDirect3DDxgiInterfaceAccess =
        surface.cast()?;
    let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

    let mut desc = D3D11_TEXTURE2D_DESC::default();
    unsafe { texture.GetDesc(&mut desc) };

    let staging_desc = D3D11_TEXTURE2D_DESC {
        Width: desc.Width,
        Height: desc.Height,
        MipLevels: 1,
        ArraySize: 1,
        Format: desc.Format,
        SampleDesc: desc.SampleDesc,
        Usage: D3D11_USAGE_STAGING,
        BindFlags: Default::default(),
        CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
        MiscFlags: Default::default(),
    };

    let staging_texture = unsafe {
        let mut staging: Option<ID3D11Texture2D> = None;
        device.CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
        staging.ok_or_else(|| anyhow!("failed to create staging texture"))?
    };

    unsafe {
        context.CopyResource(
            &staging_texture.cast::<ID3D11Resource>()?,
            &texture.cast::<ID3D11Resource>()?,
        );
    }

    let mapped = unsafe {
        let mut mapped = Default::default();
        context.Map(
            &staging_texture.cast::<ID3D11Resource>()?,
            0,
            D3D11_MAP_READ,
            0,
            Some(&mut mapped),
        )?;
        mapped
    };

    let width = desc.Width;
    let height = desc.Height;
    let row_pitch = mapped.RowPitch as usize;
    let src_data = unsafe {
        std::slice::from_raw_parts(mapped.pData as *const u8, row_pitch * height as usize)
    };

    let mut bitmap: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(width, height);
    for y in 0..height {
        let row = &src_data[y as usize * row_pitch..];
        for x in 0..width {
            let offset = x as usize * 4;
            let b = row[offset];
            let g = row[offset + 1];
            let r = row[offset + 2];
            let a = row[offset + 3];
            bitmap.put_pixel(x, y, Rgba([r, g, b, a]));
        }
    }

    unsafe {
        context.Unmap(&staging_texture.cast::<ID3D11Resource>()?, 0);
    }

    session.Close()?;
    frame_pool.Close()?;

    Ok(bitmap)
}

/// Creates a Direct3D 11 device and immediate context for GPU capture.
fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("failed to create D3D11 context"))?,
    ))
}

/// Wraps the D3D11 device in the WinRT interface the capture API expects.
fn create_direct3d_device(
    device: &ID3D11Device,
) -> Result<windows::Graphics::DirectX::Direct3D11::IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("failed to cast to IDirect3DDevice")
}

/// Creates a GraphicsCaptureItem for the given window.
fn create_capture_item(hwnd: HWND) -> Result<GraphicsCaptureItem> {
    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("failed to get IGraphicsCaptureItemInterop")?
    };

    unsafe {
        interop
            .CreateForWindow(hwnd)
            .context("failed to create capture item for window")
    }
}
