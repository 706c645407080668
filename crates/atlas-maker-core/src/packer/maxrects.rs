use super::{Packer, Placed};
use crate::config::MaxRectsHeuristic;
use crate::model::Rect;

/// MaxRects bin packer without rotation.
///
/// Every item reserves a slot of `(w + padding) x (h + padding)` with its content at the slot's
/// top-left corner. The free area is the content bound grown by `padding` on the right and bottom,
/// so a slot may hang over the bound by exactly its padding while the content stays inside.
pub struct MaxRectsPacker {
    padding: u32,
    border: Rect,
    free: Vec<Rect>,
    used: Vec<Rect>,
    heuristic: MaxRectsHeuristic,
}

impl MaxRectsPacker {
    /// `width`/`height` bound the placed contents; `padding` separates neighbours.
    pub fn new(width: u32, height: u32, padding: u32, heuristic: MaxRectsHeuristic) -> Self {
        let border = Rect::new(
            0,
            0,
            width.saturating_add(padding),
            height.saturating_add(padding),
        );
        Self {
            padding,
            border,
            free: vec![border],
            used: Vec::new(),
            heuristic,
        }
    }

    fn rect_right_ex(r: &Rect) -> u32 {
        r.x + r.w
    }
    fn rect_bottom_ex(r: &Rect) -> u32 {
        r.y + r.h
    }

    fn place_rect(&mut self, node: &Rect) {
        // split all free rectangles that intersect with node
        let mut new_free: Vec<Rect> = Vec::new();
        for fr in self.free.iter() {
            if !fr.intersects(node) {
                new_free.push(*fr);
                continue;
            }
            let fr_x2 = fr.x + fr.w;
            let fr_y2 = fr.y + fr.h;
            let n_x2 = node.x + node.w;
            let n_y2 = node.y + node.h;

            // above
            if node.y > fr.y {
                new_free.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
            }
            // below
            if n_y2 < fr_y2 {
                new_free.push(Rect::new(fr.x, n_y2, fr.w, fr_y2 - n_y2));
            }
            // left
            if node.x > fr.x {
                new_free.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
            }
            // right
            if n_x2 < fr_x2 {
                new_free.push(Rect::new(n_x2, fr.y, fr_x2 - n_x2, fr.h));
            }
        }

        self.free = new_free;
        self.prune_free_list();
        self.used.push(*node);
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let mut j = i + 1;
            let a = self.free[i];
            let a_right = Self::rect_right_ex(&a);
            let a_bottom = Self::rect_bottom_ex(&a);
            let mut remove_i = false;
            while j < self.free.len() {
                let b = self.free[j];
                let b_right = Self::rect_right_ex(&b);
                let b_bottom = Self::rect_bottom_ex(&b);
                // if a inside b
                if a.x >= b.x && a.y >= b.y && a_right <= b_right && a_bottom <= b_bottom {
                    remove_i = true;
                    break;
                }
                // if b inside a
                if b.x >= a.x && b.y >= a.y && b_right <= a_right && b_bottom <= a_bottom {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn score(&self, fr: &Rect, w: u32, h: u32) -> (i64, i64) {
        let leftover_h = fr.w as i64 - w as i64;
        let leftover_v = fr.h as i64 - h as i64;
        let short_fit = leftover_h.abs().min(leftover_v.abs());
        let long_fit = leftover_h.abs().max(leftover_v.abs());
        let area_fit = fr.area() as i64 - (w as i64) * (h as i64);
        match self.heuristic {
            MaxRectsHeuristic::BestAreaFit => (area_fit, short_fit),
            MaxRectsHeuristic::BestShortSideFit => (short_fit, long_fit),
            MaxRectsHeuristic::BestLongSideFit => (long_fit, short_fit),
            MaxRectsHeuristic::BottomLeft => (fr.y as i64, fr.x as i64),
            MaxRectsHeuristic::ContactPoint => {
                // maximize contact score: use negative for minimization
                let contact = self.contact_point_score(fr.x, fr.y, w, h);
                (-(contact as i64), area_fit)
            }
        }
    }

    fn find_position(&self, w: u32, h: u32) -> Option<Rect> {
        let mut best: Option<(i64, i64, u32, u32, Rect)> = None;

        for fr in &self.free {
            if fr.w < w || fr.h < h {
                continue;
            }
            // perfect fit early-out
            if fr.w == w && fr.h == h {
                return Some(Rect::new(fr.x, fr.y, w, h));
            }
            let (s1, s2) = self.score(fr, w, h);
            // tie-break: prefer smaller top side (y + h), then smaller x
            let top = fr.y.saturating_add(h);
            let candidate = (s1, s2, top, fr.x, Rect::new(fr.x, fr.y, w, h));
            let better = match &best {
                None => true,
                Some((b1, b2, btop, bleft, _)) => (s1, s2, top, fr.x) < (*b1, *b2, *btop, *bleft),
            };
            if better {
                best = Some(candidate);
            }
        }

        best.map(|(_, _, _, _, r)| r)
    }

    fn contact_point_score(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        let node = Rect::new(x, y, w, h);
        let mut score = 0u32;
        // contact with borders
        let border_right = self.border.x + self.border.w;
        let border_bottom = self.border.y + self.border.h;
        if node.x == self.border.x {
            score += node.h;
        }
        if node.y == self.border.y {
            score += node.w;
        }
        if node.x + node.w == border_right {
            score += node.h;
        }
        if node.y + node.h == border_bottom {
            score += node.w;
        }

        // contact with used rectangles
        for u in &self.used {
            if node.x == u.x + u.w || u.x == node.x + node.w {
                score += overlap_1d(node.y, node.y + node.h, u.y, u.y + u.h);
            }
            if node.y == u.y + u.h || u.y == node.y + node.h {
                score += overlap_1d(node.x, node.x + node.w, u.x, u.x + u.w);
            }
        }
        score
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }
}

fn overlap_1d(a1: u32, a2: u32, b1: u32, b2: u32) -> u32 {
    let start = a1.max(b1);
    let end = a2.min(b2);
    end.saturating_sub(start)
}

impl<K> Packer<K> for MaxRectsPacker {
    fn pack(&mut self, key: K, rect: &Rect) -> Option<Placed<K>> {
        let w = rect.w + self.padding;
        let h = rect.h + self.padding;
        let slot = self.find_position(w, h)?;
        self.place_rect(&slot);
        Some(Placed {
            key,
            rect: Rect::new(slot.x, slot.y, rect.w, rect.h),
        })
    }
}
