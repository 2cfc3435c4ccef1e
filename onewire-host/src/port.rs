use crate::{
    Acquire, Catalog, Device, Fault, OneWireError, OneWireResult, ReadMode, SearchKind, Serial,
    StandardCatalog, Transport,
};
use core::{cell::RefCell, fmt};

/// Builder for opening a [`Port`] with custom configuration.
pub struct PortBuilder<C = StandardCatalog> {
    path: String,
    catalog: C,
    clock_read: ReadMode,
}

impl PortBuilder {
    /// Starts configuring a port for the adapter at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        PortBuilder {
            path: path.into(),
            catalog: StandardCatalog,
            clock_read: ReadMode::default(),
        }
    }
}

impl<C: Catalog> PortBuilder<C> {
    /// Sets the family metadata used by devices on this port.
    pub fn with_catalog<D: Catalog>(self, catalog: D) -> PortBuilder<D> {
        PortBuilder {
            path: self.path,
            catalog,
            clock_read: self.clock_read,
        }
    }

    /// Sets how [`Device::get_rtc`] reads the clock register.
    pub fn with_clock_read(mut self, mode: ReadMode) -> Self {
        self.clock_read = mode;
        self
    }

    /// Acquires the adapter and opens the port.
    pub fn open<A: Acquire>(self, adapter: &A) -> OneWireResult<Port<A::Link, C>> {
        if self.path.is_empty() {
            return Err(OneWireError::invalid("1-Wire port path must not be empty"));
        }
        let link = adapter
            .acquire(&self.path)
            .map_err(|fault| OneWireError::Transport {
                path: self.path.clone(),
                fault,
            })?;
        log::debug!("opened 1-Wire port {}", self.path);
        Ok(Port {
            path: self.path,
            link: RefCell::new(Some(link)),
            catalog: self.catalog,
            clock_read: self.clock_read,
            devices: RefCell::new(None),
        })
    }
}

/// An open 1-Wire adapter.
///
/// The port exclusively owns its transport until [`Port::close`] is called or the
/// port is dropped. [`Device`]s borrow the port, so it cannot be closed while
/// devices obtained from it are alive.
pub struct Port<T: Transport, C: Catalog = StandardCatalog> {
    path: String,
    link: RefCell<Option<T>>,
    catalog: C,
    clock_read: ReadMode,
    devices: RefCell<Option<Vec<Serial>>>,
}

impl<T: Transport> Port<T> {
    /// Opens the adapter at `path` with the standard family catalog.
    ///
    /// # Errors
    /// [`OneWireError::Transport`] if the adapter cannot be acquired,
    /// [`OneWireError::InvalidArgument`] if `path` is empty.
    pub fn open<A: Acquire<Link = T>>(adapter: &A, path: &str) -> OneWireResult<Self> {
        PortBuilder::new(path).open(adapter)
    }
}

impl<T: Transport, C: Catalog> Port<T, C> {
    /// Path the port was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Family metadata for devices on this port.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Read mode used by [`Device::get_rtc`].
    pub fn clock_read(&self) -> ReadMode {
        self.clock_read
    }

    /// Whether the port still holds its transport.
    pub fn is_open(&self) -> bool {
        self.link.try_borrow().map_or(true, |link| link.is_some())
    }

    /// Releases the transport. Closing a closed port does nothing.
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.get_mut().take() {
            link.release();
            log::debug!("closed 1-Wire port {}", self.path);
        }
        *self.devices.get_mut() = None;
    }

    /// Searches the bus and returns every device found, in discovery order.
    ///
    /// Each call performs a fresh search.
    ///
    /// # Errors
    /// [`OneWireError::InvalidState`] if the port is closed; no search is attempted.
    pub fn enumerate(&self) -> OneWireResult<Vec<Device<'_, T, C>>> {
        self.scan(SearchKind::Normal, None)
            .map(|serials| self.bind(serials))
    }

    /// Like [`Port::enumerate`], restricted to devices of one family.
    pub fn enumerate_family(&self, family: u8) -> OneWireResult<Vec<Device<'_, T, C>>> {
        self.scan(SearchKind::Normal, Some(family))
            .map(|serials| self.bind(serials))
    }

    /// Devices currently signalling an alarm condition.
    pub fn alarmed(&self) -> OneWireResult<Vec<Device<'_, T, C>>> {
        self.scan(SearchKind::Alarmed, None)
            .map(|serials| self.bind(serials))
    }

    /// Devices on the bus, enumerating only on first use.
    ///
    /// The result is remembered until [`Port::forget_devices`] or [`Port::close`].
    pub fn devices(&self) -> OneWireResult<Vec<Device<'_, T, C>>> {
        let cached = self.devices.borrow().clone();
        let serials = match cached {
            Some(serials) => serials,
            None => {
                let serials = self.scan(SearchKind::Normal, None)?;
                *self.devices.borrow_mut() = Some(serials.clone());
                serials
            }
        };
        Ok(self.bind(serials))
    }

    /// Drops the list remembered by [`Port::devices`].
    pub fn forget_devices(&self) {
        self.devices.borrow_mut().take();
    }

    fn bind(&self, serials: Vec<Serial>) -> Vec<Device<'_, T, C>> {
        serials
            .into_iter()
            .map(|serial| Device::new(self, serial))
            .collect()
    }

    fn scan(&self, kind: SearchKind, family: Option<u8>) -> OneWireResult<Vec<Serial>> {
        let serials = self.with_link(|link| {
            let mut found = Vec::new();
            let mut more = link.search_first(kind, family)?;
            while more {
                let serial = link.serial()?;
                log::debug!("{}: found {}", self.path, serial);
                found.push(serial);
                more = link.search_next(kind, family)?;
            }
            Ok(found)
        })?;
        log::debug!("{}: {} device(s) on the bus", self.path, serials.len());
        Ok(serials)
    }

    /// Runs `f` against the transport.
    ///
    /// Fails with [`OneWireError::InvalidState`] on a closed port and with
    /// [`OneWireError::BusInUse`] if called from within another transaction.
    pub(crate) fn with_link<R>(
        &self,
        f: impl FnOnce(&mut T) -> Result<R, Fault>,
    ) -> OneWireResult<R> {
        let mut guard = self
            .link
            .try_borrow_mut()
            .map_err(|_| OneWireError::BusInUse)?;
        let link = guard.as_mut().ok_or(OneWireError::InvalidState)?;
        f(link).map_err(|fault| {
            log::warn!("{}: {}", self.path, fault);
            OneWireError::Io(fault)
        })
    }
}

impl<T: Transport, C: Catalog> Drop for Port<T, C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport, C: Catalog> fmt::Debug for Port<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}
