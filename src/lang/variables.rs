use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use log::debug;

use crate::lang::eval::{Function, Value};
use crate::lang::functions::BUILTINS;

type FrameRef = Rc<RefCell<Frame>>;
type FramePtr = *const RefCell<Frame>;

struct Frame {
    values: HashMap<String, Value>,
    parent: Option<FrameRef>,
}

/// Frames captured by closures
///
/// Closures only hold weak references to their defining frame, so a closure stored in that same
/// frame does not keep it alive. The heap holds the strong reference instead until `sweep` finds
/// the frame unreachable.
#[derive(Default)]
struct Heap {
    pinned: RefCell<HashMap<FramePtr, FrameRef>>,
}

/// A chain of scopes
///
/// Cloning an `Environment` is cheap and yields a handle to the same frame. Mutations through any
/// handle are visible to all.
#[derive(Clone)]
pub struct Environment {
    frame: FrameRef,
    heap: Rc<Heap>,
}

/// The scope a closure was defined in. It does not keep the scope alive on its own.
#[derive(Clone)]
pub struct WeakEnvironment {
    frame: Weak<RefCell<Frame>>,
    heap: Weak<Heap>,
}

impl WeakEnvironment {
    /// `None` once the scope has been collected
    pub fn upgrade(&self) -> Option<Environment> {
        Some(Environment {
            frame: self.frame.upgrade()?,
            heap: self.heap.upgrade()?,
        })
    }
}

/// Something still to visit while marking
enum Node {
    Value(Value),
    Frame(FrameRef),
}

impl Environment {
    /// An empty root frame, without builtins
    pub fn new() -> Self {
        Self {
            frame: Rc::new(RefCell::new(Frame {
                values: HashMap::new(),
                parent: None,
            })),
            heap: Rc::new(Heap::default()),
        }
    }

    /// Root frame holding the builtin functions, then `bindings`
    ///
    /// Host bindings are inserted last so they may shadow a builtin.
    pub fn global<I>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let env = Self::new();

        for func in &*BUILTINS {
            env.insert(func.to_string(), Value::from(*func));
        }

        for (name, val) in bindings {
            env.insert(name, val);
        }

        env
    }

    /// A new, empty frame whose parent is `self`
    pub fn child(&self) -> Self {
        Self {
            frame: Rc::new(RefCell::new(Frame {
                values: HashMap::new(),
                parent: Some(Rc::clone(&self.frame)),
            })),
            heap: Rc::clone(&self.heap),
        }
    }

    pub fn parent(&self) -> Option<Environment> {
        let parent = self.frame.borrow().parent.clone()?;

        Some(Self {
            frame: parent,
            heap: Rc::clone(&self.heap),
        })
    }

    /// Hand out a weak handle for a closure, keeping the frame alive until the next `sweep`
    pub fn capture(&self) -> WeakEnvironment {
        self.heap
            .pinned
            .borrow_mut()
            .entry(Rc::as_ptr(&self.frame))
            .or_insert_with(|| Rc::clone(&self.frame));

        WeakEnvironment {
            frame: Rc::downgrade(&self.frame),
            heap: Rc::downgrade(&self.heap),
        }
    }

    /// Look `name` up, innermost frame first
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut frame = Rc::clone(&self.frame);
        loop {
            let parent = {
                let f = frame.borrow();
                if let Some(val) = f.values.get(name) {
                    return Some(val.clone());
                }

                f.parent.clone()
            };

            frame = parent?;
        }
    }

    /// Bind `name` in this frame, shadowing any outer binding
    pub fn insert<S: Into<String>>(&self, name: S, val: Value) {
        self.frame.borrow_mut().values.insert(name.into(), val);
    }

    /// Update the nearest frame that already binds `name`, or bind it in this frame
    pub fn assign(&self, name: &str, val: Value) {
        let mut frame = Some(Rc::clone(&self.frame));
        while let Some(f) = frame {
            {
                let mut f = f.borrow_mut();
                if let Some(slot) = f.values.get_mut(name) {
                    *slot = val;
                    return;
                }
            }

            frame = f.borrow().parent.clone();
        }

        self.insert(name, val);
    }

    /// Names bound in this frame only, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.frame.borrow().values.keys().cloned().collect();
        names.sort();

        names
    }

    /// Release captured frames that can no longer be reached from this environment or from `live`
    ///
    /// Must not run while a call is in progress: frames of running calls and values held only by
    /// the evaluator are not roots. Returns how many frames were released.
    pub fn sweep<'a, I>(&self, live: I) -> usize
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut marked: HashSet<FramePtr> = HashSet::new();
        // Lists, sets, tuples and closures already visited
        let mut seen: HashSet<*const ()> = HashSet::new();
        let mut work: Vec<Node> = live.into_iter().cloned().map(Node::Value).collect();
        work.push(Node::Frame(Rc::clone(&self.frame)));

        while let Some(node) = work.pop() {
            match node {
                Node::Frame(frame) => {
                    if !marked.insert(Rc::as_ptr(&frame)) {
                        continue;
                    }

                    let f = frame.borrow();
                    work.extend(f.values.values().cloned().map(Node::Value));
                    if let Some(parent) = &f.parent {
                        work.push(Node::Frame(Rc::clone(parent)));
                    }
                }
                Node::Value(Value::List(l)) => {
                    if seen.insert(Rc::as_ptr(&l) as *const ()) {
                        work.extend(l.borrow().iter().cloned().map(Node::Value));
                    }
                }
                Node::Value(Value::Set(s)) => {
                    if seen.insert(Rc::as_ptr(&s) as *const ()) {
                        work.extend(s.borrow().iter().cloned().map(Node::Value));
                    }
                }
                Node::Value(Value::Tuple(t)) => {
                    if seen.insert(Rc::as_ptr(&t) as *const ()) {
                        work.extend(t.iter().cloned().map(Node::Value));
                    }
                }
                Node::Value(Value::Function(Function::Closure(c))) => {
                    if seen.insert(Rc::as_ptr(&c) as *const ()) {
                        if let Some(frame) = c.env.frame.upgrade() {
                            work.push(Node::Frame(frame));
                        }
                    }
                }
                Node::Value(_) => (),
            }
        }

        let released: Vec<FrameRef> = {
            let mut pinned = self.heap.pinned.borrow_mut();
            let dead: Vec<FramePtr> = pinned
                .keys()
                .filter(|ptr| !marked.contains(*ptr))
                .copied()
                .collect();
            dead.iter().filter_map(|ptr| pinned.remove(ptr)).collect()
        };
        let count = released.len();
        debug!("released {} unreachable frames", count);

        // Dropped outside the borrow: a frame's values may hold the last handle to other frames
        drop(released);

        count
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}

impl fmt::Debug for WeakEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEnvironment")
            .field("alive", &(self.frame.strong_count() > 0))
            .finish()
    }
}

#[test]
fn test_lookup_walks_outward() {
    let global = Environment::new();
    global.insert("x", Value::Integer(1));

    let inner = global.child().child();
    assert_eq!(inner.get("x"), Some(Value::Integer(1)));
    assert_eq!(inner.get("y"), None);

    inner.insert("x", Value::Integer(2));
    assert_eq!(inner.get("x"), Some(Value::Integer(2)));
    assert_eq!(global.get("x"), Some(Value::Integer(1)));
}

#[test]
fn test_assign_updates_nearest() {
    let global = Environment::new();
    global.insert("x", Value::Integer(1));

    let inner = global.child();
    inner.assign("x", Value::Integer(5));
    inner.assign("y", Value::Integer(6));

    assert_eq!(global.get("x"), Some(Value::Integer(5)));
    // New names land in the current frame and die with it
    assert_eq!(global.get("y"), None);
    assert_eq!(inner.names(), vec!["y".to_string()]);
}

#[test]
fn test_global_bindings_shadow_builtins() {
    let env = Environment::global(vec![("len".to_string(), Value::Integer(3))]);
    assert_eq!(env.get("len"), Some(Value::Integer(3)));
    assert!(matches!(env.get("range"), Some(Value::Function(_))));
}

#[test]
fn test_sweep() {
    let global = Environment::new();

    let kept = global.child();
    kept.insert("v", Value::Integer(1));
    let kept_ref = kept.capture();

    let dropped = global.child();
    let dropped_ref = dropped.capture();
    drop(dropped);

    // Neither frame is reachable from the global one, so both are unpinned
    assert_eq!(global.sweep(None), 2);
    assert!(dropped_ref.upgrade().is_none());
    // `kept` still holds its own frame
    assert_eq!(kept_ref.upgrade().unwrap().get("v"), Some(Value::Integer(1)));

    global.capture();
    assert_eq!(global.sweep(None), 0);

    // Captured twice, pinned once
    let frame = global.child();
    frame.capture();
    frame.capture();
    drop(frame);
    assert_eq!(global.sweep(None), 1);
}
