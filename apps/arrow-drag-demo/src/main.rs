use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use frame_timer_core::{
    CallbackKey, OwnerId, Repeat, ScheduleError, TimerIdentity, TimerRequest, TimerRuntimeHandle,
};
use frame_timer_runtime_std::StdTimerRuntime;

const FRAME_MILLIS: u64 = 16;
const MAX_FRAMES: u32 = 240;
const SAMPLE_INTERVAL_MILLIS: u64 = 33;
const HINT_DELAY_MILLIS: u64 = 2_000;
const FADE_STEPS: u32 = 8;

const DRAG_START_FRAME: u32 = 6;
const DRAG_END_FRAME: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f32,
    y: f32,
}

enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
}

/// Scripted touch input: press, sweep along an arc, release.
fn pointer_event(frame: u32) -> Option<PointerEvent> {
    let position = |frame: u32| {
        let t = (frame - DRAG_START_FRAME) as f32 / (DRAG_END_FRAME - DRAG_START_FRAME) as f32;
        Point {
            x: 120.0 + 360.0 * t,
            y: 80.0 + 220.0 * (t * std::f32::consts::PI).sin(),
        }
    };
    match frame {
        DRAG_START_FRAME => Some(PointerEvent::Down(position(frame))),
        f if f > DRAG_START_FRAME && f < DRAG_END_FRAME => Some(PointerEvent::Move(position(f))),
        DRAG_END_FRAME => Some(PointerEvent::Up),
        _ => None,
    }
}

#[derive(Debug)]
struct Arrow {
    tail: Point,
    head: Point,
    visible: bool,
    opacity: f32,
}

impl Arrow {
    fn hidden() -> Self {
        let origin = Point { x: 0.0, y: 0.0 };
        Self {
            tail: origin,
            head: origin,
            visible: false,
            opacity: 1.0,
        }
    }

    fn length(&self) -> f32 {
        (self.head.x - self.tail.x).hypot(self.head.y - self.tail.y)
    }
}

/// The drag-to-aim widget. The pointer position changes every input event,
/// but the arrow only follows it when the sampling timer fires.
struct ArrowWidget {
    owner: OwnerId,
    timers: TimerRuntimeHandle,
    pointer: Rc<RefCell<Point>>,
    arrow: Rc<RefCell<Arrow>>,
    faded_out: Rc<RefCell<bool>>,
}

impl ArrowWidget {
    fn new(timers: TimerRuntimeHandle) -> Self {
        Self {
            owner: OwnerId::next(),
            timers,
            pointer: Rc::new(RefCell::new(Point { x: 0.0, y: 0.0 })),
            arrow: Rc::new(RefCell::new(Arrow::hidden())),
            faded_out: Rc::new(RefCell::new(false)),
        }
    }

    fn identity(&self, name: &str) -> TimerIdentity {
        TimerIdentity::new(CallbackKey::named(name), self.owner)
    }

    fn on_load(&self) -> Result<(), ScheduleError> {
        self.timers.schedule_next_frame_for(self.identity("load"), || {
            log::info!("timer runtime ready");
        })?;
        Ok(())
    }

    fn on_start(&self, at: Point) -> Result<(), ScheduleError> {
        *self.pointer.borrow_mut() = at;
        {
            let mut arrow = self.arrow.borrow_mut();
            arrow.tail = at;
            arrow.head = at;
            arrow.visible = true;
            arrow.opacity = 1.0;
        }

        let sampler = {
            let pointer = self.pointer.clone();
            let arrow = self.arrow.clone();
            move || {
                let head = *pointer.borrow();
                let mut arrow = arrow.borrow_mut();
                arrow.head = head;
                log::debug!("arrow head at ({:.0}, {:.0})", head.x, head.y);
            }
        };
        let key = CallbackKey::named("sample");
        self.timers.schedule_after(
            TimerRequest::new(SAMPLE_INTERVAL_MILLIS, Repeat::Forever, sampler)
                .with_identity(key, self.owner),
        )?;

        // only shows up if the drag is held for a long time
        self.timers.schedule_after(
            TimerRequest::once(HINT_DELAY_MILLIS, || log::info!("release to fire"))
                .with_identity(CallbackKey::named("hint"), self.owner),
        )?;
        Ok(())
    }

    fn on_drag(&self, to: Point) {
        *self.pointer.borrow_mut() = to;
    }

    fn on_end(&self) -> Result<(), ScheduleError> {
        let cancelled = self.timers.cancel_all(self.owner);
        log::info!(
            "drag released, arrow length {:.0}, cancelled {cancelled} timer(s)",
            self.arrow.borrow().length()
        );

        let step = {
            let arrow = self.arrow.clone();
            move || {
                let mut arrow = arrow.borrow_mut();
                arrow.opacity = (arrow.opacity - 1.0 / FADE_STEPS as f32).max(0.0);
            }
        };
        let finish = {
            let arrow = self.arrow.clone();
            let faded_out = self.faded_out.clone();
            move || {
                arrow.borrow_mut().visible = false;
                *faded_out.borrow_mut() = true;
                log::info!("arrow hidden");
            }
        };
        self.timers.schedule_after(
            TimerRequest::new(FRAME_MILLIS, Repeat::Times(FADE_STEPS), step)
                .with_identity(CallbackKey::named("fade"), self.owner)
                .on_finish(finish),
        )?;
        Ok(())
    }

    fn handle(&self, event: PointerEvent) -> Result<(), ScheduleError> {
        match event {
            PointerEvent::Down(at) => self.on_start(at),
            PointerEvent::Move(to) => {
                self.on_drag(to);
                Ok(())
            }
            PointerEvent::Up => self.on_end(),
        }
    }

    fn is_done(&self) -> bool {
        *self.faded_out.borrow()
    }
}

fn main() -> Result<(), ScheduleError> {
    env_logger::init();

    println!("=== Frame Timer Arrow Drag Demo ===");
    println!("Simulates dragging an aiming arrow:");
    println!("  - A next-frame callback on load");
    println!("  - A repeating timer sampling the pointer while dragging");
    println!("  - Owner-wide cancellation on release");
    println!("  - A counted fade-out timer with a completion callback");
    println!();
    println!("Set RUST_LOG=debug to see every sample.");
    println!();

    let runtime = StdTimerRuntime::new();
    let widget = ArrowWidget::new(runtime.handle());
    widget.on_load()?;

    for frame in 0..MAX_FRAMES {
        if let Some(event) = pointer_event(frame) {
            widget.handle(event)?;
        }
        runtime.drive_frame();

        if widget.is_done() && !runtime.wants_frame() {
            break;
        }
        thread::sleep(Duration::from_millis(FRAME_MILLIS));
    }

    let timers = runtime.runtime();
    println!(
        "Finished after {} frames; {} entries pooled for reuse.",
        timers.frame_id(),
        timers.pooled_count()
    );
    println!("Final arrow: {:?}", widget.arrow.borrow());
    Ok(())
}
