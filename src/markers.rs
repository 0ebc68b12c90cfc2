//! # Phase markers for external telemetry.
//!
//! A fixed catalog of named points emitted in START/END pairs around the
//! phases of bringing a bridge up (context creation, bundle run, module
//! registry build, ...). External collectors match the names, so they are
//! stable strings and never renamed, including the odd `NativeModule_*` pair.
//!
//! ```text
//! Markers::begin(Phase::RunBundle) ──► MarkerLogged(RUN_JS_BUNDLE_START)
//!        │
//!   PhaseSpan (work happens)
//!        │
//!   end() / drop ──────────────────► MarkerLogged(RUN_JS_BUNDLE_END)
//! ```
//!
//! ## Rules
//! - START always precedes the matching END; a span emits END exactly once,
//!   even when dropped during an early return or unwinding.
//! - Markers are published on the [`Bus`] and logged at `trace` level.

use std::sync::Arc;

use crate::events::{Bus, Event, EventKind};

/// Which side of a phase a marker sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Start,
    End,
}

macro_rules! phases {
    ($( $(#[$doc:meta])* $phase:ident => $start:literal, $end:literal; )+) => {
        /// An instrumented phase.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Phase {
            $( $(#[$doc])* $phase, )+
        }

        impl Phase {
            /// Every phase, in catalog order.
            pub const ALL: &'static [Phase] = &[$( Phase::$phase, )+];

            /// Stable marker name for `edge` of this phase.
            pub const fn marker_name(self, edge: Edge) -> &'static str {
                match (self, edge) {
                    $(
                        (Phase::$phase, Edge::Start) => $start,
                        (Phase::$phase, Edge::End) => $end,
                    )+
                }
            }
        }
    };
}

phases! {
    /// Whole host context construction.
    CreateContext => "CREATE_REACT_CONTEXT_START", "CREATE_REACT_CONTEXT_END";
    ProcessPackages => "PROCESS_PACKAGES_START", "PROCESS_PACKAGES_END";
    BuildModuleRegistry => "BUILD_NATIVE_MODULE_REGISTRY_START", "BUILD_NATIVE_MODULE_REGISTRY_END";
    BuildScriptModuleConfig => "BUILD_JS_MODULE_CONFIG_START", "BUILD_JS_MODULE_CONFIG_END";
    CreateInstance => "CREATE_CATALYST_INSTANCE_START", "CREATE_CATALYST_INSTANCE_END";
    /// Loading and evaluating the script bundle.
    RunBundle => "RUN_JS_BUNDLE_START", "RUN_JS_BUNDLE_END";
    /// Per-module initialization.
    ModuleInitialize => "NativeModule_start", "NativeModule_end";
    SetupContext => "SETUP_REACT_CONTEXT_START", "SETUP_REACT_CONTEXT_END";
    CreateUiManagerModule => "CREATE_UI_MANAGER_MODULE_START", "CREATE_UI_MANAGER_MODULE_END";
    CreateViewManagers => "CREATE_VIEW_MANAGERS_START", "CREATE_VIEW_MANAGERS_END";
    CreateUiManagerConstants => "CREATE_UI_MANAGER_MODULE_CONSTANTS_START", "CREATE_UI_MANAGER_MODULE_CONSTANTS_END";
    CreateModule => "CREATE_MODULE_START", "CREATE_MODULE_END";
    ProcessCorePackage => "PROCESS_CORE_REACT_PACKAGE_START", "PROCESS_CORE_REACT_PACKAGE_END";
    CorePackageModuleInfo => "CORE_REACT_PACKAGE_GET_REACT_MODULE_INFO_PROVIDER_START", "CORE_REACT_PACKAGE_GET_REACT_MODULE_INFO_PROVIDER_END";
    UiManagerConstantsConvert => "UI_MANAGER_MODULE_CONSTANTS_CONVERT_START", "UI_MANAGER_MODULE_CONSTANTS_CONVERT_END";
    CreateI18nConstants => "CREATE_I18N_MODULE_CONSTANTS_START", "CREATE_I18N_MODULE_CONSTANTS_END";
    I18nConstantsConvert => "I18N_MODULE_CONSTANTS_CONVERT_START", "I18N_MODULE_CONSTANTS_CONVERT_END";
    CreateI18nAssetsModule => "CREATE_I18N_ASSETS_MODULE_START", "CREATE_I18N_ASSETS_MODULE_END";
}

/// One named point: a phase and an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker {
    pub phase: Phase,
    pub edge: Edge,
}

impl Marker {
    pub const fn start(phase: Phase) -> Self {
        Marker {
            phase,
            edge: Edge::Start,
        }
    }

    pub const fn end(phase: Phase) -> Self {
        Marker {
            phase,
            edge: Edge::End,
        }
    }

    /// Stable name, e.g. `"RUN_JS_BUNDLE_START"`.
    pub const fn name(self) -> &'static str {
        self.phase.marker_name(self.edge)
    }

    /// Looks a marker up by its stable name.
    pub fn from_name(name: &str) -> Option<Marker> {
        Phase::ALL.iter().find_map(|&phase| {
            [Edge::Start, Edge::End]
                .into_iter()
                .map(|edge| Marker { phase, edge })
                .find(|m| m.name() == name)
        })
    }
}

/// Marker emitter bound to an event bus. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Markers {
    bus: Bus,
}

impl Markers {
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }

    /// Emits a single marker.
    pub fn emit(&self, marker: Marker) {
        self.publish(marker, None);
    }

    /// Emits a single marker with a tag (e.g. the module being created).
    pub fn emit_tagged(&self, marker: Marker, tag: impl Into<Arc<str>>) {
        self.publish(marker, Some(tag.into()));
    }

    /// Emits the START marker of `phase` and returns a span that emits END.
    #[must_use = "dropping the span immediately emits END"]
    pub fn begin(&self, phase: Phase) -> PhaseSpan {
        self.begin_inner(phase, None)
    }

    /// Like [`begin`](Self::begin), with a tag carried by both markers.
    #[must_use = "dropping the span immediately emits END"]
    pub fn begin_tagged(&self, phase: Phase, tag: impl Into<Arc<str>>) -> PhaseSpan {
        self.begin_inner(phase, Some(tag.into()))
    }

    fn begin_inner(&self, phase: Phase, tag: Option<Arc<str>>) -> PhaseSpan {
        self.publish(Marker::start(phase), tag.clone());
        PhaseSpan {
            markers: self.clone(),
            phase,
            tag,
        }
    }

    fn publish(&self, marker: Marker, tag: Option<Arc<str>>) {
        tracing::trace!(marker = marker.name(), tag = tag.as_deref(), "marker");
        let mut ev = Event::new(EventKind::MarkerLogged).with_marker(marker);
        if let Some(tag) = tag {
            ev = ev.with_name(tag);
        }
        self.bus.publish(ev);
    }
}

/// An open phase; emits its END marker when ended or dropped.
#[derive(Debug)]
pub struct PhaseSpan {
    markers: Markers,
    phase: Phase,
    tag: Option<Arc<str>>,
}

impl PhaseSpan {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Closes the phase.
    pub fn end(self) {}
}

impl Drop for PhaseSpan {
    fn drop(&mut self) {
        self.markers.publish(Marker::end(self.phase), self.tag.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<(&'static str, Option<Arc<str>>)> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let Some(m) = ev.marker {
                out.push((m.name(), ev.name.clone()));
            }
        }
        out
    }

    #[test]
    fn names_are_stable_and_resolvable() {
        assert_eq!(Marker::start(Phase::CreateContext).name(), "CREATE_REACT_CONTEXT_START");
        assert_eq!(Marker::end(Phase::RunBundle).name(), "RUN_JS_BUNDLE_END");
        assert_eq!(Marker::start(Phase::ModuleInitialize).name(), "NativeModule_start");
        assert_eq!(
            Marker::from_name("NativeModule_end"),
            Some(Marker::end(Phase::ModuleInitialize))
        );
        assert_eq!(Marker::from_name("RUN_BUNDLE_START"), None);
        assert_eq!(Marker::from_name("run_js_bundle_start"), None);

        for &phase in Phase::ALL {
            for m in [Marker::start(phase), Marker::end(phase)] {
                assert_eq!(Marker::from_name(m.name()), Some(m));
            }
        }
    }

    #[test]
    fn catalog_matches_collector_names() {
        let starts: Vec<&str> = Phase::ALL.iter().map(|&p| Marker::start(p).name()).collect();
        assert_eq!(
            starts,
            vec![
                "CREATE_REACT_CONTEXT_START",
                "PROCESS_PACKAGES_START",
                "BUILD_NATIVE_MODULE_REGISTRY_START",
                "BUILD_JS_MODULE_CONFIG_START",
                "CREATE_CATALYST_INSTANCE_START",
                "RUN_JS_BUNDLE_START",
                "NativeModule_start",
                "SETUP_REACT_CONTEXT_START",
                "CREATE_UI_MANAGER_MODULE_START",
                "CREATE_VIEW_MANAGERS_START",
                "CREATE_UI_MANAGER_MODULE_CONSTANTS_START",
                "CREATE_MODULE_START",
                "PROCESS_CORE_REACT_PACKAGE_START",
                "CORE_REACT_PACKAGE_GET_REACT_MODULE_INFO_PROVIDER_START",
                "UI_MANAGER_MODULE_CONSTANTS_CONVERT_START",
                "CREATE_I18N_MODULE_CONSTANTS_START",
                "I18N_MODULE_CONSTANTS_CONVERT_START",
                "CREATE_I18N_ASSETS_MODULE_START",
            ]
        );
        for &phase in Phase::ALL {
            let start = Marker::start(phase).name();
            let end = Marker::end(phase).name();
            match start.strip_suffix("_START") {
                Some(stem) => assert_eq!(end, format!("{stem}_END")),
                None => assert_eq!((start, end), ("NativeModule_start", "NativeModule_end")),
            }
        }
    }

    #[test]
    fn span_emits_start_then_end() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let markers = Markers::new(bus);

        let span = markers.begin(Phase::RunBundle);
        assert_eq!(span.phase(), Phase::RunBundle);
        span.end();

        assert_eq!(
            drain(&mut rx),
            vec![("RUN_JS_BUNDLE_START", None), ("RUN_JS_BUNDLE_END", None)]
        );
    }

    #[test]
    fn early_return_still_closes_the_span() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let markers = Markers::new(bus);

        fn create(markers: &Markers, fail: bool) -> Result<(), &'static str> {
            let _span = markers.begin_tagged(Phase::CreateModule, "Timing");
            if fail {
                return Err("boom");
            }
            markers.emit(Marker::start(Phase::ModuleInitialize));
            Ok(())
        }

        assert!(create(&markers, true).is_err());
        let tag: Option<Arc<str>> = Some("Timing".into());
        assert_eq!(
            drain(&mut rx),
            vec![
                ("CREATE_MODULE_START", tag.clone()),
                ("CREATE_MODULE_END", tag)
            ]
        );
    }
}
