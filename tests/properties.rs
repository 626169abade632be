use proptest::prelude::*;
use std::f64::consts::TAU;
use striker_vision::core_modules::blob::{FrameGeometry, Point};
use striker_vision::core_modules::emitter::Message;
use striker_vision::core_modules::kinematics::{bearing, distance_from_area};

fn rel_close(a: f64, b: f64) -> bool {
    if b == 0.0 {
        a.abs() <= 1e-9
    } else {
        ((a - b) / b).abs() <= 1e-3
    }
}

proptest! {
    #[test]
    fn bearing_is_always_in_range(cx in -1000.0f64..1000.0, cy in -1000.0f64..1000.0) {
        let frame = FrameGeometry::new(320, 240);
        prop_assume!(cx != 160.0 || cy != 120.0);
        let theta = bearing(Point::new(cx, cy), &frame);
        prop_assert!(theta >= 0.0);
        prop_assert!(theta < TAU);
    }

    #[test]
    fn distance_decreases_as_area_grows(area in 1u32..1_000_000, extra in 1u32..10_000, k in 1.0f64..2000.0) {
        let near = distance_from_area(area + extra, k).expect("non-zero area");
        let far = distance_from_area(area, k).expect("non-zero area");
        prop_assert!(near < far);
    }

    #[test]
    fn goal_line_round_trips(
        distance in 0.1f64..1000.0,
        theta in 0.0f64..TAU,
        width in 0.0f64..500.0,
        height in 0.0f64..500.0,
        confidence in 0u8..=100,
    ) {
        let sent = Message::Goal {
            name: "blue".to_string(),
            distance,
            theta,
            size: Some((width, height)),
            confidence: Some(confidence),
        };
        let received: Message = format!("{sent}\n").parse().expect("own output parses");
        match received {
            Message::Goal { name, distance: d, theta: t, size: Some((w, h)), confidence: Some(c) } => {
                prop_assert_eq!(name, "blue");
                prop_assert!(rel_close(d, distance));
                prop_assert!(rel_close(t, theta));
                prop_assert!(rel_close(w, width));
                prop_assert!(rel_close(h, height));
                prop_assert_eq!(c, confidence);
            }
            other => prop_assert!(false, "unexpected message {:?}", other),
        }
    }

    #[test]
    fn ball_line_round_trips(
        x in -500.0f64..500.0,
        y in -500.0f64..500.0,
        vx in -5000.0f64..5000.0,
        vy in -5000.0f64..5000.0,
        theta in 0.0f64..TAU,
        confidence in 0u8..=100,
    ) {
        let sent = Message::Ball { x, y, x_velocity: vx, y_velocity: vy, theta, confidence };
        let received: Message = sent.to_string().parse().expect("own output parses");
        prop_assert_eq!(received, sent);
    }
}

#[test]
fn documented_goal_line_round_trips() {
    let sent = Message::Goal {
        name: "yellow".to_string(),
        distance: 55.2,
        theta: 1.047,
        size: Some((12.0, 6.0)),
        confidence: Some(81),
    };
    let line = format!("{sent}\n");
    assert_eq!(line, "yellow,55.2,1.047,12,6,81\n");
    assert_eq!(line.parse::<Message>().expect("parses"), sent);
}
