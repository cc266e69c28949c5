//! Windows backends: SendInput injection and low-level hook listening.

use crate::error::{Error, Result};
use crate::event::Button;
use crate::injector::InputInjector;
use crate::keycode::Key;
use crate::listener::{EventSink, InputListener};
use std::mem::size_of;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use windows::Win32::Foundation::{LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP,
    MOUSE_EVENT_FLAGS, MOUSEEVENTF_HWHEEL, MOUSEEVENTF_MOVE, MOUSEEVENTF_WHEEL, MOUSEINPUT,
    SendInput, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetCursorPos, GetMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG,
    MSLLHOOKSTRUCT, PostThreadMessageW, SetWindowsHookExW, UnhookWindowsHookEx, WH_KEYBOARD_LL,
    WH_MOUSE_LL, WM_KEYDOWN, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP,
    WM_MOUSEHWHEEL, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP,
    WM_SYSKEYDOWN, WM_XBUTTONDOWN, WM_XBUTTONUP,
};

const WHEEL_DELTA: i32 = 120;

// ============================================================================
// Injection
// ============================================================================

fn key_to_vk(key: Key) -> u16 {
    match key {
        Key::ShiftLeft => 0xA0,
        Key::ShiftRight => 0xA1,
        Key::ControlLeft => 0xA2,
        Key::F13 => 0x7C,
        Key::F14 => 0x7D,
        Key::F15 => 0x7E,
    }
}

/// Send a mouse event
fn sim_mouse_event(flags: MOUSE_EVENT_FLAGS, data: u32, dx: i32, dy: i32) -> Result<()> {
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };

    let inputs = [input];
    let result = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };

    if result != 1 {
        Err(Error::InjectFailed("SendInput failed for mouse event".into()))
    } else {
        Ok(())
    }
}

/// Send a keyboard event
fn sim_keyboard_event(vk: u16, up: bool) -> Result<()> {
    let dwflags = if up {
        KEYEVENTF_KEYUP
    } else {
        KEYBD_EVENT_FLAGS(0)
    };

    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: 0,
                dwFlags: dwflags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };

    let inputs = [input];
    let result = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };

    if result != 1 {
        Err(Error::InjectFailed(
            "SendInput failed for keyboard event".into(),
        ))
    } else {
        Ok(())
    }
}

/// Injector backed by `SendInput`.
///
/// Relative moves use `MOUSEEVENTF_MOVE` without the absolute flag: they
/// generate the same low-level input events a physical mouse does, which
/// is what activity-tracking software watches for.
pub(crate) struct SystemInjector;

impl SystemInjector {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl InputInjector for SystemInjector {
    fn mouse_move_relative(&self, dx: i32, dy: i32) -> Result<()> {
        sim_mouse_event(MOUSEEVENTF_MOVE, 0, dx, dy)
    }

    fn mouse_scroll(&self, notches: i32, horizontal: bool) -> Result<()> {
        let flags = if horizontal {
            MOUSEEVENTF_HWHEEL
        } else {
            MOUSEEVENTF_WHEEL
        };
        sim_mouse_event(flags, notches.wrapping_mul(WHEEL_DELTA) as u32, 0, 0)
    }

    fn key_tap(&self, key: Key) -> Result<()> {
        let vk = key_to_vk(key);
        sim_keyboard_event(vk, false)?;
        sim_keyboard_event(vk, true)?;
        Ok(())
    }

    fn mouse_position(&self) -> Result<(i32, i32)> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }
            .map_err(|e| Error::QueryFailed(format!("GetCursorPos failed: {}", e)))?;
        Ok((point.x, point.y))
    }
}

// ============================================================================
// Listening
// ============================================================================

// Wrapper for HHOOK to make it Send + Sync
#[derive(Clone, Copy)]
struct SendableHHOOK(HHOOK);

// SAFETY: HHOOK is just a handle/pointer that the Windows API owns.
// It's safe to send between threads because Windows handles are thread-safe.
unsafe impl Send for SendableHHOOK {}
unsafe impl Sync for SendableHHOOK {}

/// Sink receiving events from the hook callbacks.
static SINK: Mutex<Option<Arc<dyn EventSink>>> = Mutex::new(None);

/// Flag to signal stopping.
static STOP_FLAG: Mutex<Option<Arc<AtomicBool>>> = Mutex::new(None);

/// Hook handles.
static KEYBOARD_HOOK: Mutex<Option<SendableHHOOK>> = Mutex::new(None);
static MOUSE_HOOK: Mutex<Option<SendableHHOOK>> = Mutex::new(None);

/// Thread ID for message posting.
static THREAD_ID: Mutex<u32> = Mutex::new(0);

/// Mouse hook callback
unsafe extern "system" fn mouse_callback(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let data = unsafe { *(lparam.0 as *const MSLLHOOKSTRUCT) };
        let (x, y) = (data.pt.x, data.pt.y);
        let msg = wparam.0 as u32;

        if let Ok(guard) = SINK.lock() {
            if let Some(sink) = guard.as_ref() {
                match msg {
                    WM_MOUSEMOVE => sink.mouse_moved(x, y),
                    WM_LBUTTONDOWN => sink.mouse_clicked(Button::Left, x, y, true),
                    WM_LBUTTONUP => sink.mouse_clicked(Button::Left, x, y, false),
                    WM_RBUTTONDOWN => sink.mouse_clicked(Button::Right, x, y, true),
                    WM_RBUTTONUP => sink.mouse_clicked(Button::Right, x, y, false),
                    WM_MBUTTONDOWN => sink.mouse_clicked(Button::Middle, x, y, true),
                    WM_MBUTTONUP => sink.mouse_clicked(Button::Middle, x, y, false),
                    WM_XBUTTONDOWN | WM_XBUTTONUP => {
                        let xbutton = ((data.mouseData >> 16) & 0xFFFF) as u8;
                        let button = Button::from_number(xbutton.saturating_add(3));
                        sink.mouse_clicked(button, x, y, msg == WM_XBUTTONDOWN);
                    }
                    WM_MOUSEWHEEL => {
                        let delta = ((data.mouseData >> 16) & 0xFFFF) as i16;
                        sink.mouse_scrolled(x, y, 0.0, f64::from(delta) / f64::from(WHEEL_DELTA));
                    }
                    WM_MOUSEHWHEEL => {
                        let delta = ((data.mouseData >> 16) & 0xFFFF) as i16;
                        sink.mouse_scrolled(x, y, f64::from(delta) / f64::from(WHEEL_DELTA), 0.0);
                    }
                    _ => {}
                }
            }
        }
    }

    let hook = MOUSE_HOOK.lock().ok().and_then(|g| g.map(|h| h.0));
    unsafe { CallNextHookEx(hook, code, wparam, lparam) }
}

/// Keyboard hook callback
unsafe extern "system" fn keyboard_callback(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let msg = wparam.0 as u32;
        if msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN {
            let kb = unsafe { *(lparam.0 as *const KBDLLHOOKSTRUCT) };
            if let Ok(guard) = SINK.lock() {
                if let Some(sink) = guard.as_ref() {
                    sink.key_pressed(kb.vkCode);
                }
            }
        }
    }

    let hook = KEYBOARD_HOOK.lock().ok().and_then(|g| g.map(|h| h.0));
    unsafe { CallNextHookEx(hook, code, wparam, lparam) }
}

/// Install the hooks and pump messages until the stop flag clears.
///
/// Low-level hooks must be installed by the thread that runs the message
/// loop, so installation happens here and the outcome is reported back
/// through `ready`.
fn hook_thread(ready: &mpsc::Sender<Result<()>>) {
    {
        let mut tid = THREAD_ID.lock().unwrap_or_else(PoisonError::into_inner);
        *tid = unsafe { GetCurrentThreadId() };
    }

    let mouse_hook = match unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_callback), None, 0) }
    {
        Ok(hook) => hook,
        Err(e) => {
            let _ = ready.send(Err(Error::ListenerStartFailed(format!(
                "failed to set mouse hook: {}",
                e
            ))));
            return;
        }
    };

    let keyboard_hook =
        match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_callback), None, 0) } {
            Ok(hook) => hook,
            Err(e) => {
                unsafe {
                    let _ = UnhookWindowsHookEx(mouse_hook);
                }
                let _ = ready.send(Err(Error::ListenerStartFailed(format!(
                    "failed to set keyboard hook: {}",
                    e
                ))));
                return;
            }
        };

    *MOUSE_HOOK.lock().unwrap_or_else(PoisonError::into_inner) =
        Some(SendableHHOOK(mouse_hook));
    *KEYBOARD_HOOK.lock().unwrap_or_else(PoisonError::into_inner) =
        Some(SendableHHOOK(keyboard_hook));

    let _ = ready.send(Ok(()));

    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            if let Ok(guard) = STOP_FLAG.lock() {
                if let Some(flag) = guard.as_ref() {
                    if !flag.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
        }
    }

    unsafe {
        if let Some(hook) = MOUSE_HOOK
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = UnhookWindowsHookEx(hook.0);
        }
        if let Some(hook) = KEYBOARD_HOOK
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = UnhookWindowsHookEx(hook.0);
        }
    }

    *SINK.lock().unwrap_or_else(PoisonError::into_inner) = None;
    *STOP_FLAG.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Listener backed by `WH_MOUSE_LL` / `WH_KEYBOARD_LL` hooks.
pub(crate) struct SystemListener {
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SystemListener {
    pub(crate) fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }
}

impl InputListener for SystemListener {
    fn start(&self, sink: Arc<dyn EventSink>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        *SINK.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        *STOP_FLAG.lock().unwrap_or_else(PoisonError::into_inner) = Some(self.running.clone());

        let (ready_tx, ready_rx) = mpsc::channel();
        let running = self.running.clone();
        let handle = std::thread::spawn(move || {
            hook_thread(&ready_tx);
            running.store(false, Ordering::SeqCst);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                *SINK.lock().unwrap_or_else(PoisonError::into_inner) = None;
                *STOP_FLAG.lock().unwrap_or_else(PoisonError::into_inner) = None;
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(Error::ListenerStartFailed(
                    "hook thread exited before reporting readiness".into(),
                ))
            }
        }
    }

    fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(Error::NotRunning);
        }

        {
            let tid = THREAD_ID.lock().unwrap_or_else(PoisonError::into_inner);
            if *tid != 0 {
                unsafe {
                    let _ = PostThreadMessageW(*tid, WM_QUIT, WPARAM(0), LPARAM(0));
                }
            }
        }

        if let Some(handle) = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join hook thread".into()))?;
        }

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SystemListener {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}
