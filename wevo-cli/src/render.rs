//! SVG rendering of a finished diagram.
//!
//! Circular edges are sampled into polylines (robust for any radius),
//! straight edges are clipped to the drawing box — equal-weight
//! bisector pieces reach out to the engine's nominal "infinite"
//! endpoints and would otherwise dwarf the viewport.

use anyhow::{Context, Result};
use glam::DVec2;
use std::f64::consts::TAU;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use wevo_core::VorDiag;

const ARC_SAMPLES: usize = 64;

pub fn write_svg(path: &Path, diag: &VorDiag) -> Result<()> {
    let (lo, hi) = bounds(diag);
    let size = hi - lo;

    let mut body = String::new();
    let stroke_width = size.max_element() / 400.0;

    for arc in diag.edges() {
        let center = arc.circle.center.approx();
        let radius = arc.circle.radius_f64();
        let a1 = (arc.source.approx() - center).to_angle();
        let mut a2 = (arc.target.approx() - center).to_angle();
        if a2 <= a1 {
            a2 += TAU;
        }

        let mut d = String::new();
        for i in 0..=ARC_SAMPLES {
            let a = a1 + (a2 - a1) * (i as f64 / ARC_SAMPLES as f64);
            let p = center + radius * DVec2::from_angle(a);
            let _ = write!(d, "{}{:.3} {:.3} ", if i == 0 { "M" } else { "L" }, p.x, -p.y);
        }
        let _ = writeln!(
            body,
            "<path d=\"{}\" fill=\"none\" stroke=\"black\" stroke-width=\"{stroke_width}\"/>",
            d.trim_end()
        );
    }

    for seg in diag.segs() {
        let Some((a, b)) = clip_seg(seg.source.approx(), seg.target.approx(), lo, hi) else {
            continue;
        };
        let _ = writeln!(
            body,
            "<line x1=\"{:.3}\" y1=\"{:.3}\" x2=\"{:.3}\" y2=\"{:.3}\" stroke=\"black\" stroke-width=\"{stroke_width}\"/>",
            a.x, -a.y, b.x, -b.y
        );
    }

    for site in diag.sites() {
        let c = site.center().approx();
        let _ = writeln!(
            body,
            "<circle cx=\"{:.3}\" cy=\"{:.3}\" r=\"{}\" fill=\"seagreen\"/>",
            c.x,
            -c.y,
            stroke_width * 2.0
        );
        let _ = writeln!(
            body,
            "<text x=\"{:.3}\" y=\"{:.3}\" font-size=\"{}\" fill=\"seagreen\">s{} ({})</text>",
            c.x + stroke_width * 3.0,
            -c.y - stroke_width * 3.0,
            stroke_width * 10.0,
            site.id(),
            site.weight_f64()
        );
    }

    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{:.3} {:.3} {:.3} {:.3}\">\n{body}</svg>\n",
        lo.x, -hi.y, size.x, size.y
    );
    fs::write(path, svg).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Site bounding box with a half-span margin.
fn bounds(diag: &VorDiag) -> (DVec2, DVec2) {
    let mut lo = DVec2::splat(f64::INFINITY);
    let mut hi = DVec2::splat(f64::NEG_INFINITY);
    for site in diag.sites() {
        let c = site.center().approx();
        lo = lo.min(c);
        hi = hi.max(c);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (DVec2::splat(-1.0), DVec2::splat(1.0));
    }
    let pad = (hi - lo).max_element().max(1.0) * 0.5;
    (lo - pad, hi + pad)
}

/// Liang–Barsky segment clip against an axis-aligned box.
fn clip_seg(a: DVec2, b: DVec2, lo: DVec2, hi: DVec2) -> Option<(DVec2, DVec2)> {
    let d = b - a;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [
        (-d.x, a.x - lo.x),
        (d.x, hi.x - a.x),
        (-d.y, a.y - lo.y),
        (d.y, hi.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }

    if t0 > t1 {
        return None;
    }
    Some((a + d * t0, a + d * t1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wevo_core::SiteRecord;

    #[test]
    fn clips_long_segments_into_the_box() {
        let lo = DVec2::new(-10.0, -10.0);
        let hi = DVec2::new(10.0, 10.0);
        let (a, b) =
            clip_seg(DVec2::new(0.0, 0.0), DVec2::new(1e12, 0.0), lo, hi).unwrap();
        assert_eq!(a, DVec2::new(0.0, 0.0));
        assert_eq!(b, DVec2::new(10.0, 0.0));

        assert!(clip_seg(DVec2::new(20.0, 20.0), DVec2::new(30.0, 20.0), lo, hi).is_none());
    }

    #[test]
    fn writes_a_well_formed_svg() {
        let records = [
            SiteRecord { x: 0, y: 0, weight: 2 },
            SiteRecord { x: 10, y: 0, weight: 1 },
        ];
        let diag = VorDiag::build(&records, None).unwrap();

        let dir = std::env::temp_dir().join("wevo-render-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("diagram.svg");
        write_svg(&path, &diag).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<svg"));
        assert!(text.contains("<path"));
        assert!(text.ends_with("</svg>\n"));
    }
}
