use super::ForegroundSource;
use crate::types::{AppId, Result, ScreentrackError};
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

/// Focused-app lookup through EWMH properties on an X11 display
pub struct X11Source {
    conn: RustConnection,
    root: Window,
    net_active_window: Atom,
    net_wm_pid: Atom,
    system: Mutex<System>,
}

fn platform_err(e: impl std::fmt::Display) -> ScreentrackError {
    ScreentrackError::Platform(e.to_string())
}

impl X11Source {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(platform_err)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| ScreentrackError::Platform(format!("no screen {}", screen_num)))?;

        let net_active_window = intern(&conn, "_NET_ACTIVE_WINDOW")?;
        let net_wm_pid = intern(&conn, "_NET_WM_PID")?;

        Ok(Self {
            conn,
            root,
            net_active_window,
            net_wm_pid,
            system: Mutex::new(System::new()),
        })
    }

    fn property_u32(&self, window: Window, property: Atom, kind: AtomEnum) -> Result<Option<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, kind, 0, 1)
            .map_err(platform_err)?
            .reply()
            .map_err(platform_err)?;
        Ok(reply.value32().and_then(|mut values| values.next()))
    }

    fn active_window(&self) -> Result<Option<Window>> {
        let window = self.property_u32(self.root, self.net_active_window, AtomEnum::WINDOW)?;
        Ok(window.filter(|&w| w != x11rb::NONE))
    }

    fn process_name(&self, pid: u32) -> Option<AppId> {
        let mut system = self.system.lock().ok()?;
        let pid = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
        system
            .process(pid)
            .map(|process| process.name().to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
    }

    /// Class part of WM_CLASS ("instance\0class\0")
    fn window_class(&self, window: Window) -> Result<Option<AppId>> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 256)
            .map_err(platform_err)?
            .reply()
            .map_err(platform_err)?;

        let class = reply
            .value
            .split(|&b| b == 0)
            .filter(|part| !part.is_empty())
            .last()
            .map(|part| String::from_utf8_lossy(part).into_owned());
        Ok(class)
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .map_err(platform_err)?
        .reply()
        .map_err(platform_err)?
        .atom)
}

impl ForegroundSource for X11Source {
    fn name(&self) -> &str {
        "x11"
    }

    fn foreground_app(&self) -> Result<Option<AppId>> {
        let Some(window) = self.active_window()? else {
            return Ok(None);
        };

        // Process may have exited between the two lookups; fall back to the window class
        if let Some(pid) = self.property_u32(window, self.net_wm_pid, AtomEnum::CARDINAL)? {
            if let Some(name) = self.process_name(pid) {
                return Ok(Some(name));
            }
        }

        self.window_class(window)
    }
}
