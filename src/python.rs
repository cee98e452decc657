//! PyO3 bindings
//!
//! ```python
//! from alice_event import Event
//! ev = Event()
//! ev.signal()
//! ev.wait()
//! assert not ev.wait_timeout(0.01)
//! ```
//!
//! Blocking calls release the GIL while parked.
//!
//! Author: Moroya Sakamoto

use std::time::Duration;

use pyo3::exceptions::{PyMemoryError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::error::EventError;
use crate::event::Event;

#[pyclass(name = "Event", module = "alice_event", frozen)]
pub struct PyEvent {
    inner: Event,
}

#[pymethods]
impl PyEvent {
    #[new]
    fn new() -> PyResult<Self> {
        Event::new()
            .map(|inner| Self { inner })
            .map_err(|e| PyMemoryError::new_err(e.to_string()))
    }

    fn signal(&self) {
        self.inner.signal();
    }

    fn wait(&self, py: Python<'_>) {
        py.allow_threads(|| self.inner.wait());
    }

    /// Returns False if `seconds` elapsed without a signal
    fn wait_timeout(&self, py: Python<'_>, seconds: f64) -> PyResult<bool> {
        let timeout = Duration::try_from_secs_f64(seconds)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        match py.allow_threads(|| self.inner.wait_timeout(timeout)) {
            Ok(()) => Ok(true),
            Err(EventError::Timeout) => Ok(false),
            Err(e) => Err(PyValueError::new_err(e.to_string())),
        }
    }

    fn try_wait(&self) -> bool {
        self.inner.try_wait()
    }

    #[getter]
    fn is_signaled(&self) -> bool {
        self.inner.is_signaled()
    }

    fn stats<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let stats = self.inner.stats();
        let dict = PyDict::new_bound(py);
        dict.set_item("posts", stats.posts)?;
        dict.set_item("coalesced", stats.coalesced)?;
        dict.set_item("consumed", stats.consumed)?;
        dict.set_item("timeouts", stats.timeouts)?;
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        format!("Event(signaled={})", self.inner.is_signaled())
    }
}

#[pymodule]
fn alice_event(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyEvent>()?;
    Ok(())
}
