//! Point cloud files and pose application.
//!
//! Clouds are stored on disk in a subset of the PCD format: a textual header
//! (`FIELDS x y z`) followed by either ascii rows or little-endian f32
//! triples.

extern crate byteorder;
extern crate cgmath;
extern crate nom;
extern crate rayon;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use cgmath::{Matrix4, Point3, Transform};
use nom::bytes::complete::take_till;
use nom::character::complete::{multispace0, space0};
use nom::multi::count;
use nom::number::complete::double;
use nom::sequence::preceded;
use nom::IResult;
use rayon::prelude::*;

use std::fs::File;
use std::io::prelude::*;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use crate::model::Error;

/// A point cloud. Point order is stable: correction mutates points in place
/// and rigid motion recovery pairs points by array position.
pub type Cloud = Vec<Point3<f64>>;

/// Apply a rigid transform to every point of a cloud, in place.
pub fn transform_cloud(cloud: &mut Cloud, m: &Matrix4<f64>) {
    cloud.par_iter_mut().for_each(|p| *p = m.transform_point(*p));
}

/// One `KEY value...` header line.
fn header_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = multispace0(input)?;
    let (input, key) = take_till(|c: char| c.is_whitespace())(input)?;
    let (input, _) = space0(input)?;
    let (input, rest) = take_till(|c| c == '\n' || c == '\r')(input)?;
    Ok((input, (key, rest)))
}

/// Read a point cloud from a PCD file. Both `DATA ascii` and `DATA binary`
/// clouds are accepted; only x, y, z fields are supported.
pub fn load_pcd(path: &Path) -> Result<Cloud, Error> {
    let mut file = File::open(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;

    // The payload of a binary cloud is not UTF-8, so split the file at the
    // end of the DATA line before parsing the header as text.
    let data_start = contents
        .windows(5)
        .position(|w| w == b"DATA ")
        .ok_or_else(|| Error::ParseError(format!("{}: no DATA line", path.display())))?;
    let header_end = contents[data_start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| data_start + i + 1)
        .ok_or_else(|| Error::ParseError(format!("{}: truncated header", path.display())))?;
    let header = std::str::from_utf8(&contents[..header_end])
        .map_err(|e| Error::ParseError(format!("{}: {}", path.display(), e)))?;
    let payload = &contents[header_end..];

    let mut num_points = None;
    let mut ascii = true;
    let mut rest = header;
    loop {
        let (r, (key, value)) = header_line(rest).map_err(Error::from)?;
        rest = r;
        if key.is_empty() {
            return Err(Error::ParseError(format!(
                "{}: unterminated header",
                path.display()
            )));
        }
        match key {
            "POINTS" => {
                num_points = Some(usize::from_str(value.trim()).map_err(|e| {
                    Error::ParseError(format!("{}: bad POINTS count: {}", path.display(), e))
                })?)
            }
            "FIELDS" => {
                if value.trim() != "x y z" {
                    return Err(Error::ParseError(format!(
                        "{}: unsupported fields {}",
                        path.display(),
                        value
                    )));
                }
            }
            "DATA" => {
                ascii = value.trim() == "ascii";
                break;
            }
            // VERSION, SIZE, TYPE, COUNT, WIDTH, HEIGHT, VIEWPOINT, comments
            _ => {}
        }
    }
    let num_points = num_points
        .ok_or_else(|| Error::ParseError(format!("{}: no POINTS line", path.display())))?;

    if ascii {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::ParseError(format!("{}: {}", path.display(), e)))?;
        let point = |input| -> IResult<&str, Point3<f64>> {
            let (input, v) = count(preceded(multispace0, double), 3)(input)?;
            Ok((input, Point3::new(v[0], v[1], v[2])))
        };
        count(point, num_points)(text)
            .map(|x| x.1)
            .map_err(Error::from)
    } else {
        let mut rdr = std::io::Cursor::new(payload);
        let mut cloud = Vec::with_capacity(num_points);
        for _ in 0..num_points {
            let x = rdr.read_f32::<LittleEndian>()?;
            let y = rdr.read_f32::<LittleEndian>()?;
            let z = rdr.read_f32::<LittleEndian>()?;
            cloud.push(Point3::new(x as f64, y as f64, z as f64));
        }
        Ok(cloud)
    }
}

/// Write a point cloud in PCD format.
pub fn write_pcd(path: &Path, cloud: &Cloud, binary: bool) -> Result<(), Error> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(&mut file, "VERSION 0.7")?;
    writeln!(&mut file, "FIELDS x y z")?;
    writeln!(&mut file, "SIZE 4 4 4")?;
    writeln!(&mut file, "TYPE F F F")?;
    writeln!(&mut file, "COUNT 1 1 1")?;
    writeln!(&mut file, "WIDTH {}", cloud.len())?;
    writeln!(&mut file, "HEIGHT 1")?;
    writeln!(&mut file, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(&mut file, "POINTS {}", cloud.len())?;
    if binary {
        writeln!(&mut file, "DATA binary")?;
        for p in cloud {
            file.write_f32::<LittleEndian>(p.x as f32)?;
            file.write_f32::<LittleEndian>(p.y as f32)?;
            file.write_f32::<LittleEndian>(p.z as f32)?;
        }
    } else {
        writeln!(&mut file, "DATA ascii")?;
        for p in cloud {
            writeln!(&mut file, "{} {} {}", p.x, p.y, p.z)?;
        }
    }
    Ok(())
}

#[test]
fn test_pcd_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cloud: Cloud = vec![
        Point3::new(0.5, -1.25, 3.0),
        Point3::new(2.0, 0.0, -0.75),
        Point3::new(-4.5, 1.5, 0.25),
    ];

    let ascii = dir.path().join("a.pcd");
    write_pcd(&ascii, &cloud, false).unwrap();
    assert_eq!(load_pcd(&ascii).unwrap(), cloud);

    let binary = dir.path().join("b.pcd");
    write_pcd(&binary, &cloud, true).unwrap();
    assert_eq!(load_pcd(&binary).unwrap(), cloud);
}

#[test]
fn test_transform_cloud() {
    let mut cloud: Cloud = vec![Point3::new(1.0, 0.0, 0.0)];
    let m = Matrix4::from_translation(cgmath::Vector3::new(0.0, 2.0, 0.0));
    transform_cloud(&mut cloud, &m);
    assert_eq!(cloud[0], Point3::new(1.0, 2.0, 0.0));
}
