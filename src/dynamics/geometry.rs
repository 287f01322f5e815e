use nalgebra::{Point2, Vector2};

use crate::dynamics::params::TruckParams;
use crate::dynamics::state::WorldState;

// ---------------------------------------------------------------------------
// Reference points on the combination, from a front-axle world state
// ---------------------------------------------------------------------------

/// Tracked points of the combination in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxlePoints {
    pub front_axle: Point2<f64>,
    pub fifth_wheel: Point2<f64>,
    pub trailer_axle: Point2<f64>,
}

impl AxlePoints {
    /// `front` must be referenced at the steer axle (see
    /// [`WorldState::at_front_axle`]).
    pub fn from_front_state(front: &WorldState, params: &TruckParams) -> Self {
        let front_axle = Point2::new(front.x, front.y);
        let fifth_wheel =
            front_axle - front.tractor_direction() * params.steer_axle_to_fifth_wheel();
        let trailer_axle = fifth_wheel - front.trailer_direction() * params.l2;
        Self { front_axle, fifth_wheel, trailer_axle }
    }
}

/// Corner points of one rigid body, counter-clockwise from front-left.
pub type Outline = [Point2<f64>; 4];

/// Rectangular plan-view outlines of tractor and trailer.
pub fn body_outlines(front: &WorldState, params: &TruckParams) -> (Outline, Outline) {
    let pts = AxlePoints::from_front_state(front, params);

    let tractor = rectangle(
        pts.front_axle,
        front.tractor_direction(),
        params.truck_str_ax2front,
        params.truck_str_ax2rear,
        params.truck_width,
    );
    let trailer = rectangle(
        pts.fifth_wheel,
        front.trailer_direction(),
        params.trailer_5th2front,
        params.trailer_5th2rear,
        params.trailer_width,
    );
    (tractor, trailer)
}

fn rectangle(
    anchor: Point2<f64>,
    dir: Vector2<f64>,
    ahead: f64,
    behind: f64,
    width: f64,
) -> Outline {
    let left = Vector2::new(-dir.y, dir.x) * (width / 2.0);
    let nose = anchor + dir * ahead;
    let tail = anchor - dir * behind;
    [nose + left, tail + left, tail - left, nose - left]
}
