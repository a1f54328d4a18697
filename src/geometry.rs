//! Footprint geometry: WKT parsing and surface area.
//!
//! Only the two shapes a footprint can take are understood: `POLYGON` and
//! `MULTIPOLYGON`, in lon/lat degrees. An optional EWKT `SRID=n;` prefix is
//! accepted and ignored.
//!
//! Area is computed on a sphere of the mean Earth radius with the
//! spherical-excess line integral, which is accurate to well under a percent
//! for footprint-sized polygons and needs no database round trip.

use std::fmt;

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A `(lon, lat)` position in degrees.
pub type Position = (f64, f64);

/// A closed ring of positions (first == last).
pub type Ring = Vec<Position>;

/// One polygon: exterior ring followed by zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

/// A parsed footprint.
#[derive(Debug, Clone, PartialEq)]
pub enum Footprint {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

/// Why a WKT string was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct WktError(String);

impl fmt::Display for WktError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for WktError {}

fn err<T>(msg: impl Into<String>) -> Result<T, WktError> {
    Err(WktError(msg.into()))
}

impl Footprint {
    /// Parses a `POLYGON` or `MULTIPOLYGON` WKT string.
    pub fn parse(wkt: &str) -> Result<Self, WktError> {
        let mut text = wkt.trim();
        if text.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("SRID=")) {
            match text.find(';') {
                Some(pos) => text = text[pos + 1..].trim_start(),
                None => return err("SRID prefix is not terminated by ';'"),
            }
        }

        let mut parser = Parser::new(text);
        let keyword = parser.keyword();
        let footprint = if keyword.eq_ignore_ascii_case("POLYGON") {
            Footprint::Polygon(parser.polygon()?)
        } else if keyword.eq_ignore_ascii_case("MULTIPOLYGON") {
            parser.expect('(')?;
            let mut polygons = vec![parser.polygon()?];
            while parser.eat(',') {
                polygons.push(parser.polygon()?);
            }
            parser.expect(')')?;
            Footprint::MultiPolygon(polygons)
        } else if keyword.is_empty() {
            return err("empty geometry");
        } else {
            return err(format!("unsupported geometry type '{}'", keyword));
        };
        parser.finish()?;
        Ok(footprint)
    }

    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Footprint::Polygon(p) => std::slice::from_ref(p),
            Footprint::MultiPolygon(ps) => ps,
        }
    }

    /// Surface area in km².
    pub fn area_km2(&self) -> f64 {
        self.polygons().iter().map(Polygon::area_km2).sum()
    }
}

impl Polygon {
    /// Surface area in km², holes subtracted.
    pub fn area_km2(&self) -> f64 {
        let outer = ring_area_km2(&self.exterior);
        let holes: f64 = self.holes.iter().map(|h| ring_area_km2(h)).sum();
        (outer - holes).max(0.0)
    }
}

/// Unsigned spherical area of a closed ring in km².
pub fn ring_area_km2(ring: &[Position]) -> f64 {
    if ring.len() < 4 {
        return 0.0;
    }
    let mut total = 0.0;
    for pair in ring.windows(2) {
        let (lon1, lat1) = pair[0];
        let (lon2, lat2) = pair[1];
        let mut dlon = (lon2 - lon1).to_radians();
        // Take the short way around across the antimeridian.
        if dlon > std::f64::consts::PI {
            dlon -= 2.0 * std::f64::consts::PI;
        } else if dlon < -std::f64::consts::PI {
            dlon += 2.0 * std::f64::consts::PI;
        }
        total += dlon * (2.0 + lat1.to_radians().sin() + lat2.to_radians().sin());
    }
    (total * EARTH_RADIUS_KM * EARTH_RADIUS_KM / 2.0).abs()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn keyword(&mut self) -> &'a str {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), WktError> {
        if self.eat(c) {
            Ok(())
        } else {
            err(format!("expected '{}' at offset {}", c, self.pos))
        }
    }

    fn finish(&mut self) -> Result<(), WktError> {
        self.skip_ws();
        if self.rest().is_empty() {
            Ok(())
        } else {
            err(format!("unexpected trailing input at offset {}", self.pos))
        }
    }

    fn number(&mut self) -> Result<f64, WktError> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
            .unwrap_or(rest.len());
        let token = &rest[..len];
        let value: f64 = token
            .parse()
            .map_err(|_| WktError(format!("invalid number '{}' at offset {}", token, self.pos)))?;
        if !value.is_finite() {
            return err(format!("non-finite coordinate at offset {}", self.pos));
        }
        self.pos += len;
        Ok(value)
    }

    fn position(&mut self) -> Result<Position, WktError> {
        let lon = self.number()?;
        let lat = self.number()?;
        if !(-90.0..=90.0).contains(&lat) {
            return err(format!("latitude {} out of range", lat));
        }
        Ok((lon, lat))
    }

    fn ring(&mut self) -> Result<Ring, WktError> {
        self.expect('(')?;
        let mut ring = vec![self.position()?];
        while self.eat(',') {
            ring.push(self.position()?);
        }
        self.expect(')')?;

        if ring.len() < 4 {
            return err(format!("ring has {} positions, at least 4 required", ring.len()));
        }
        if ring.first() != ring.last() {
            return err("ring is not closed");
        }
        Ok(ring)
    }

    fn polygon(&mut self) -> Result<Polygon, WktError> {
        self.expect('(')?;
        let exterior = self.ring()?;
        let mut holes = Vec::new();
        while self.eat(',') {
            holes.push(self.ring()?);
        }
        self.expect(')')?;
        Ok(Polygon { exterior, holes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_DEGREE_AT_EQUATOR: &str = "POLYGON((0 0,1 0,1 1,0 1,0 0))";

    #[test]
    fn test_parse_polygon() {
        let fp = Footprint::parse(ONE_DEGREE_AT_EQUATOR).unwrap();
        match fp {
            Footprint::Polygon(p) => {
                assert_eq!(p.exterior.len(), 5);
                assert!(p.holes.is_empty());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_is_case_and_whitespace_insensitive() {
        let fp = Footprint::parse("  polygon ( ( 0 0 , 1 0 , 1 1 , 0 1 , 0 0 ) )  ").unwrap();
        assert_eq!(fp.polygons().len(), 1);
    }

    #[test]
    fn test_parse_srid_prefix() {
        let fp = Footprint::parse("SRID=4326;POLYGON((0 0,1 0,1 1,0 1,0 0))").unwrap();
        assert_eq!(fp.polygons().len(), 1);
    }

    #[test]
    fn test_parse_multipolygon_with_hole() {
        let wkt = "MULTIPOLYGON(((0 0,4 0,4 4,0 4,0 0),(1 1,2 1,2 2,1 2,1 1)),((10 10,11 10,11 11,10 10)))";
        let fp = Footprint::parse(wkt).unwrap();
        assert_eq!(fp.polygons().len(), 2);
        assert_eq!(fp.polygons()[0].holes.len(), 1);
    }

    #[test]
    fn test_rejects_malformed_input() {
        for bad in [
            "",
            "POINT(1 2)",
            "POLYGON((0 0,1 0,1 1,0 1))",
            "POLYGON((0 0,1 0,0 0))",
            "POLYGON((0 0,1 0,1 1,0 1,0 0)",
            "POLYGON((0 0,1 0,1 1,0 1,0 0)) extra",
            "POLYGON((0 0,1 x,1 1,0 1,0 0))",
            "POLYGON((0 0,1 0,1 95,0 1,0 0))",
            "SRID=4326 POLYGON((0 0,1 0,1 1,0 1,0 0))",
        ] {
            assert!(Footprint::parse(bad).is_err(), "accepted: {:?}", bad);
        }
    }

    #[test]
    fn test_area_of_one_degree_square_at_equator() {
        let area = Footprint::parse(ONE_DEGREE_AT_EQUATOR).unwrap().area_km2();
        // 1°×1° at the equator is ~12 364 km² on the mean sphere.
        assert!((area - 12_364.0).abs() < 30.0, "area = {}", area);
    }

    #[test]
    fn test_area_ignores_winding_order() {
        let ccw = Footprint::parse("POLYGON((0 0,1 0,1 1,0 1,0 0))").unwrap().area_km2();
        let cw = Footprint::parse("POLYGON((0 0,0 1,1 1,1 0,0 0))").unwrap().area_km2();
        assert!((ccw - cw).abs() < 1e-6);
    }

    #[test]
    fn test_hole_is_subtracted() {
        let solid = Footprint::parse("POLYGON((0 0,4 0,4 4,0 4,0 0))").unwrap().area_km2();
        let holed = Footprint::parse("POLYGON((0 0,4 0,4 4,0 4,0 0),(1 1,2 1,2 2,1 2,1 1))")
            .unwrap()
            .area_km2();
        let hole = Footprint::parse("POLYGON((1 1,2 1,2 2,1 2,1 1))").unwrap().area_km2();
        assert!((solid - holed - hole).abs() < 1e-6);
    }

    #[test]
    fn test_area_shrinks_towards_poles() {
        let equator = Footprint::parse("POLYGON((0 0,1 0,1 1,0 1,0 0))").unwrap().area_km2();
        let north = Footprint::parse("POLYGON((0 60,1 60,1 61,0 61,0 60))").unwrap().area_km2();
        assert!(north < equator * 0.55);
    }

    #[test]
    fn test_antimeridian_crossing_ring() {
        let crossing = Footprint::parse("POLYGON((179.5 0,-179.5 0,-179.5 1,179.5 1,179.5 0))")
            .unwrap()
            .area_km2();
        let reference = Footprint::parse(ONE_DEGREE_AT_EQUATOR).unwrap().area_km2();
        assert!((crossing - reference).abs() < 1.0);
    }
}
