use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Physical parameters of the tractor-semitrailer combination
// ---------------------------------------------------------------------------

/// Tractor and trailer constants for the linear two-body lateral model.
///
/// Distances in m, masses in kg, yaw inertias in kg·m^2, cornering
/// stiffnesses in N/rad (summed over the tires of one axle).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruckParams {
    pub m1: f64,                  // tractor mass
    pub i1: f64,                  // tractor yaw inertia
    pub m2: f64,                  // trailer mass
    pub i2: f64,                  // trailer yaw inertia
    pub a1: f64,                  // tractor CG → steer axle
    pub c: f64,                   // fifth wheel ahead of tractor rear axle
    pub l1: f64,                  // tractor wheelbase
    pub l2: f64,                  // fifth wheel → trailer axle group
    pub a2: f64,                  // fifth wheel → trailer CG
    pub h1: f64,                  // tractor CG → fifth wheel
    pub b1: f64,                  // tractor CG → drive axles
    pub b2: f64,                  // trailer CG → trailer axles
    pub c1: f64,                  // steer axle
    pub c2: f64,                  // first drive axle
    pub c3: f64,                  // second drive axle
    pub c4: f64,                  // first trailer axle
    pub c5: f64,                  // second trailer axle
    pub truck_width: f64,
    pub truck_str_ax2front: f64,  // steer axle → front bumper
    pub truck_str_ax2rear: f64,   // steer axle → rear of tractor frame
    pub trailer_width: f64,
    pub trailer_5th2front: f64,   // fifth wheel → trailer nose
    pub trailer_5th2rear: f64,    // fifth wheel → trailer tail
}

impl Default for TruckParams {
    /// Sleeper-cab 6x4 tractor with a tandem-axle box trailer.
    fn default() -> Self {
        Self {
            m1: 9159.63,
            i1: 55660.3,
            m2: 27091.8,
            i2: 386841.0,
            a1: 2.43264,
            c: 0.2286,
            l1: 5.7404,
            l2: 16.104 - 0.914 - 3.083 - 1.2446 / 2.0,
            a2: 5.9336,
            h1: 3.0792,
            b1: 3.3078,
            b2: 5.5511,
            c1: 187020.2 * 2.0,
            c2: 130274.0 * 4.0,
            c3: 130274.0 * 4.0,
            c4: 115000.0 * 4.0,
            c5: 115000.0 * 4.0,
            truck_width: 2.57,
            truck_str_ax2front: 1.295,
            truck_str_ax2rear: 7.275,
            trailer_width: 2.59,
            trailer_5th2front: 0.914,
            trailer_5th2rear: 16.104,
        }
    }
}

impl TruckParams {
    /// Lateral stiffness moment about the tractor CG.
    pub fn cs1(&self) -> f64 {
        self.a1 * self.c1 - self.b1 * (self.c2 + self.c3)
    }

    /// Lateral stiffness second moment about the tractor CG.
    pub fn cq1(&self) -> f64 {
        self.a1.powi(2) * self.c1 + self.b1.powi(2) * (self.c2 + self.c3)
    }

    /// Combined trailer axle stiffness.
    pub fn c45(&self) -> f64 {
        self.c4 + self.c5
    }

    /// Distance from the steer axle back to the fifth wheel.
    pub fn steer_axle_to_fifth_wheel(&self) -> f64 {
        self.l1 - self.c
    }
}

// ---------------------------------------------------------------------------
// Parameters with cached derived coefficients
// ---------------------------------------------------------------------------

/// Parameter set frozen for the lifetime of a simulator.
///
/// `cs1` and `cq1` are computed once here and reused by every stiffness
/// matrix build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub truck: TruckParams,
    pub cs1: f64,
    pub cq1: f64,
}

impl From<TruckParams> for ModelParams {
    fn from(truck: TruckParams) -> Self {
        Self {
            cs1: truck.cs1(),
            cq1: truck.cq1(),
            truck,
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        TruckParams::default().into()
    }
}
