//! Directional hint indicators.
//!
//! Stateless: every call writes the full visibility of all four indicators
//! and the picture border, so whatever the previous tick showed is
//! overwritten.

use viewfinder_common::HintElements;

use crate::evaluator::Verdict;
use crate::host::HostEngine;

/// The four correction hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintDirection {
    Up,
    Down,
    Left,
    Right,
}

impl HintDirection {
    pub const ALL: [HintDirection; 4] = [
        HintDirection::Up,
        HintDirection::Down,
        HintDirection::Left,
        HintDirection::Right,
    ];

    /// Indicator element for this direction
    pub fn element(self, elements: &HintElements) -> &str {
        match self {
            HintDirection::Up => &elements.up,
            HintDirection::Down => &elements.down,
            HintDirection::Left => &elements.left,
            HintDirection::Right => &elements.right,
        }
    }

    pub fn is_set(self, verdict: &Verdict) -> bool {
        match self {
            HintDirection::Up => verdict.up,
            HintDirection::Down => verdict.down,
            HintDirection::Left => verdict.left,
            HintDirection::Right => verdict.right,
        }
    }
}

/// Show the hints for `verdict`; the border follows `engaged`
pub fn present(
    verdict: &Verdict,
    engaged: bool,
    elements: &HintElements,
    border: &str,
    host: &mut dyn HostEngine,
) {
    for dir in HintDirection::ALL {
        host.set_active(dir.element(elements), engaged && dir.is_set(verdict));
    }
    host.set_active(border, engaged);
}

/// Hide all four indicators
pub fn clear(elements: &HintElements, host: &mut dyn HostEngine) {
    for dir in HintDirection::ALL {
        host.set_active(dir.element(elements), false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;

    #[test]
    fn test_present_maps_each_flag() {
        let elements = HintElements::default();
        let mut host = RecordingHost::new();
        let verdict = Verdict {
            aligned: false,
            up: true,
            down: false,
            left: false,
            right: true,
        };
        present(&verdict, true, &elements, "Border", &mut host);
        assert!(host.is_active("HintUp"));
        assert!(!host.is_active("HintDown"));
        assert!(!host.is_active("HintLeft"));
        assert!(host.is_active("HintRight"));
        assert!(host.is_active("Border"));
    }

    #[test]
    fn test_not_engaged_hides_everything() {
        let elements = HintElements::default();
        let mut host = RecordingHost::new();
        let verdict = Verdict {
            aligned: false,
            up: true,
            down: false,
            left: true,
            right: false,
        };
        present(&verdict, false, &elements, "Border", &mut host);
        for dir in HintDirection::ALL {
            assert!(!host.is_active(dir.element(&elements)));
        }
        assert!(!host.is_active("Border"));
    }

    #[test]
    fn test_clear_overrides_previous_tick() {
        let elements = HintElements::default();
        let mut host = RecordingHost::new();
        let verdict = Verdict {
            aligned: false,
            up: false,
            down: true,
            left: true,
            right: false,
        };
        present(&verdict, true, &elements, "Border", &mut host);
        clear(&elements, &mut host);
        assert!(!host.is_active("HintDown"));
        assert!(!host.is_active("HintLeft"));
        // Border visibility is owned by the engagement, not by clear()
        assert!(host.is_active("Border"));
    }
}
