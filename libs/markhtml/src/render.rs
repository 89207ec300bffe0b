//! The streaming renderer: walks a component's markers in order,
//! copying literal text and calling back, with wrapper endings kept
//! on a pooled stack.

use std::mem;
use std::sync::Arc;

use crate::component::{Component, Part, Resume, Wrapper};
use crate::marker::Action;
use crate::pool::{EndingStack, Frame, POOLS};
use crate::response::{AttrResponse, Response, WrapperResponse};

pub(crate) enum Outcome {
    Finished,
    Halted,
    /// A skip jumped past the end of a pre-content half: the wrapped
    /// content is dropped and the post-content half starts there.
    Swallowed(Resume),
}

/// A pending attribute skip-content: when output reaches `at`,
/// continue at `to` with marker `marker`.
#[derive(Clone, Copy)]
struct Jump {
    at: u32,
    to: u32,
    marker: usize,
    /// The skipped range holds the content marker.
    swallows: bool,
}

/// Run the endings of `frame` last first, as long as the response
/// isn't halted. Clears the frame either way.
pub(crate) fn run_endings(r: &mut Response, frame: &mut Frame) {
    while let Some(ending) = frame.pop() {
        if r.is_halted() {
            break
        }
        ending(r);
    }
    frame.clear();
}

fn stack_of<'s>(stack: &'s mut Option<&mut EndingStack>) -> &'s mut EndingStack {
    match stack {
        Some(s) => &mut **s,
        None => unreachable!("wrapper marker in a component without wrapper nesting"),
    }
}

/// Move the frames still open at the end of a pre-content half to
/// the caller, outermost first.
fn hand_over(stack: Option<&mut EndingStack>, depth: usize, carry: Option<&mut Frame>) {
    if depth == 0 {
        return
    }
    match (stack, carry) {
        (Some(stack), Some(carry)) =>
            for frame in &mut stack.frames[..depth] {
                carry.extend(frame.drain(..));
            },
        _ => panic!("ending stack not empty ({depth} frames) at the end of a component"),
    }
}

impl<D> Component<D> {
    /// Render into `r`. Does nothing if `r` is halted.
    pub fn render(&self, r: &mut Response, data: &D) {
        match self.part {
            Part::PreContent => {
                let mut carried = POOLS.frame();
                if let Outcome::Halted = self.run(r, data, self.start(), Some(&mut *carried)) {
                    return
                }
                run_endings(r, &mut carried);
            }
            Part::Whole | Part::PostContent => {
                self.run(r, data, self.start(), None);
            }
        }
    }

    /// Render starting at `from`, with the caller's ending frame and
    /// skip flags saved away for the duration. Frames still open at
    /// the end are moved to `carry`.
    pub(crate) fn run(
        &self, r: &mut Response, data: &D, from: Resume, carry: Option<&mut Frame>,
    ) -> Outcome {
        if r.is_halted() {
            return Outcome::Halted
        }
        let saved_frame = mem::take(&mut r.frame);
        let saved_flags = r.take_skip_flags();
        let outcome =
            if self.max_wrapper_nesting == 0 {
                self.walk(r, data, from, None, carry)
            } else {
                let mut stack = POOLS.acquire_stack(self.max_wrapper_nesting);
                self.walk(r, data, from, Some(&mut *stack), carry)
            };
        r.frame = saved_frame;
        r.restore_skip_flags(saved_flags);
        outcome
    }

    fn walk(
        &self,
        r: &mut Response,
        data: &D,
        from: Resume,
        mut stack: Option<&mut EndingStack>,
        carry: Option<&mut Frame>,
    ) -> Outcome {
        let tpl = &*self.template;
        let html: &[u8] = &tpl.html;
        let lit = move |from: u32, to: u32| &html[from as usize..to as usize];
        let end_i = self.markers.end;
        let end_pos = self.html.end;
        let pre = self.part == Part::PreContent;

        let mut i = from.marker;
        let mut pos = from.pos;
        let mut depth = 0;
        let mut pending: Option<Jump> = None;
        // Offset of the `<` of the last start tag carrying attribute
        // markers, and the output length there
        let mut tag_mark: Option<(u32, usize)> = None;
        let mut next_el = tpl.elements.partition_point(|el| el.open_start < pos);

        loop {
            if let Some(j) = pending {
                let next = if i < end_i { tpl.markers[i].position() } else { end_pos };
                if next >= j.at {
                    pending = None;
                    r.write_bytes_no_escape(lit(pos, j.at));
                    if j.swallows {
                        hand_over(stack, depth, carry);
                        return Outcome::Swallowed(Resume { marker: j.marker, pos: j.to })
                    }
                    pos = j.to;
                    i = j.marker;
                    continue
                }
            }
            if i >= end_i {
                break
            }
            let m = &tpl.markers[i];
            let at = m.position();
            // Any marker in or behind a tracked start tag: cut the
            // output there first, for skip_element
            while let Some(el) = tpl.elements.get(next_el) {
                if el.open_start >= at {
                    break
                }
                if el.open_start >= pos {
                    r.write_bytes_no_escape(lit(pos, el.open_start));
                    pos = el.open_start;
                    tag_mark = Some((el.open_start, r.out_len()));
                }
                next_el += 1;
            }
            match &m.action {
                Action::Plain(f) => {
                    r.write_bytes_no_escape(lit(pos, at));
                    pos = at;
                    if r.is_halted() {
                        return Outcome::Halted
                    }
                    f(r, data);
                    if r.is_halted() {
                        return Outcome::Halted
                    }
                }
                Action::Attributes(f, e) => {
                    let el = &tpl.elements[*e];
                    r.write_bytes_no_escape(lit(pos, at));
                    pos = at;
                    if r.is_halted() {
                        return Outcome::Halted
                    }
                    f(&mut AttrResponse::new(r), data);
                    if r.is_halted() {
                        return Outcome::Halted
                    }
                    let skip_content = r.take_skip_content();
                    if r.take_skip_element() {
                        let mark = match tag_mark {
                            Some((start, len)) if start == el.open_start => len,
                            _ => r.out_len(),
                        };
                        r.truncate_output(mark);
                        pending = None;
                        if pre && el.contains_content {
                            hand_over(stack, depth, carry);
                            return Outcome::Swallowed(
                                Resume { marker: el.next_marker, pos: el.close_end })
                        }
                        pos = el.close_end;
                        i = el.next_marker;
                        continue
                    }
                    if skip_content && el.has_content() {
                        pending = Some(Jump {
                            at: el.open_end,
                            to: el.close_start,
                            marker: el.next_marker,
                            swallows: pre && el.contains_content,
                        });
                    }
                }
                Action::WrapperStart(f, end) => {
                    r.write_bytes_no_escape(lit(pos, at));
                    pos = at;
                    if r.is_halted() {
                        return Outcome::Halted
                    }
                    let st = stack_of(&mut stack);
                    r.frame = mem::take(&mut st.frames[depth]);
                    depth += 1;
                    f(&mut WrapperResponse::new(r), data);
                    st.frames[depth - 1] = mem::take(&mut r.frame);
                    if r.is_halted() {
                        return Outcome::Halted
                    }
                    if r.take_skip_content() {
                        let target = tpl.markers[*end].position();
                        if *end >= end_i {
                            // the `}}` is behind the content marker
                            hand_over(stack, depth, carry);
                            return Outcome::Swallowed(Resume { marker: *end, pos: target })
                        }
                        pos = target;
                        i = *end;
                        depth -= 1;
                        run_endings(r, &mut st.frames[depth]);
                        if r.is_halted() {
                            return Outcome::Halted
                        }
                    }
                }
                Action::WrapperEnd(start) => {
                    r.write_bytes_no_escape(lit(pos, at));
                    pos = at;
                    if r.is_halted() {
                        return Outcome::Halted
                    }
                    // Ends of wrappers opened in the pre-content half
                    // were handed over there
                    if *start >= self.markers.start {
                        let st = stack_of(&mut stack);
                        depth -= 1;
                        run_endings(r, &mut st.frames[depth]);
                        if r.is_halted() {
                            return Outcome::Halted
                        }
                    }
                }
            }
            i += 1;
        }

        r.write_bytes_no_escape(lit(pos, end_pos));
        if r.is_halted() {
            return Outcome::Halted
        }
        hand_over(stack, depth, carry);
        Outcome::Finished
    }
}

impl<D> Wrapper<D> {
    /// Render the wrapper into `r` with `inner` producing the content
    /// at the content marker. `inner` is not called if a skip drops
    /// the content or the response was halted.
    pub fn render(&self, r: &mut Response, data: &D, inner: impl FnOnce(&mut Response)) {
        let mut carried = POOLS.frame();
        let resume = match self.pre.run(r, data, self.pre.start(), Some(&mut *carried)) {
            Outcome::Halted => return,
            Outcome::Finished => {
                inner(r);
                self.post.start()
            }
            Outcome::Swallowed(resume) => resume,
        };
        run_endings(r, &mut carried);
        self.post.run(r, data, resume, None);
    }
}

impl<'r> WrapperResponse<'r> {
    /// Wrap the content of the current wrapper marker in `wrapper`:
    /// its pre-content half is rendered now, its post-content half
    /// when the current marker's `}}` is reached (before endings added
    /// earlier, after endings added later).
    pub fn wrap<D2: Send + 'static>(&mut self, wrapper: &Arc<Wrapper<D2>>, data: D2) {
        let r = &mut *self.r;
        let mut carried = POOLS.frame();
        let resume =
            match wrapper.pre.run(r, &data, wrapper.pre.start(), Some(&mut *carried)) {
                Outcome::Halted => return,
                Outcome::Finished => wrapper.post.start(),
                Outcome::Swallowed(resume) => {
                    r.skip_content = true;
                    resume
                }
            };
        let wrapper = Arc::clone(wrapper);
        r.frame.push(Box::new(move |r: &mut Response| {
            wrapper.post.run(r, &data, resume, None);
        }));
        r.frame.extend(carried.drain(..));
    }
}
