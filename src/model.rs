//! Scan-set descriptions: an ordered list of scans, each with an identifier,
//! a point cloud file reference, and a rigid pose placing the scan into the
//! common frame.

extern crate cgmath;
extern crate nom;

use cgmath::{Matrix4, Point3, Transform};
use nom::bytes::complete::{tag, take_till};
use nom::character::complete::{char, multispace0, multispace1};
use nom::multi::{count, many0};
use nom::number::complete::double;
use nom::sequence::{delimited, preceded};
use nom::IResult;

use std::fs::File;
use std::io::prelude::*;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum Error {
    ParseError(String),
    IOError(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ParseError(s) => write!(f, "parse error: {}", s),
            Error::IOError(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IOError(e)
    }
}

impl<I: std::fmt::Debug> From<nom::Err<I>> for Error {
    fn from(e: nom::Err<I>) -> Self {
        Error::ParseError(format!("{:?}", e))
    }
}

/// A single scan entry: stable identifier, point cloud file reference
/// (relative to the data set root), and the rigid pose mapping the scan's
/// local points into the common frame.
#[derive(Debug, Clone)]
pub struct Scan {
    pub id: String,
    pub file: String,
    pub pose: Matrix4<f64>,
}

/// An ordered scan set. Order is acquisition order and is load-bearing: loop
/// detection and correction windowing both index into it.
#[derive(Debug, Clone)]
pub struct ScanModel {
    data_path: String,
    pub scans: Vec<Scan>,
}

impl ScanModel {
    pub fn new(data_path: String, scans: Vec<Scan>) -> Self {
        ScanModel { data_path, scans }
    }

    /// Read a scan-set description from disk.
    pub fn from_file(path: &Path) -> Result<ScanModel, Error> {
        fn quoted(input: &str) -> IResult<&str, &str> {
            delimited(char('"'), take_till(|c| c == '"'), char('"'))(input)
        }

        fn attribute<'a>(name: &'static str) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
            move |input| {
                let (input, _) = multispace1(input)?;
                let (input, _) = tag(name)(input)?;
                let (input, _) = char('=')(input)?;
                quoted(input)
            }
        }

        fn pose(input: &str) -> IResult<&str, Matrix4<f64>> {
            let (input, _) = multispace0(input)?;
            let (input, _) = tag("<Pose>")(input)?;
            let (input, v) = count(preceded(multispace0, double), 16)(input)?;
            let (input, _) = multispace0(input)?;
            let (input, _) = tag("</Pose>")(input)?;
            // rows in the file, columns in cgmath
            let m = Matrix4::new(
                v[0], v[4], v[8], v[12], //
                v[1], v[5], v[9], v[13], //
                v[2], v[6], v[10], v[14], //
                v[3], v[7], v[11], v[15],
            );
            Ok((input, m))
        }

        fn scan(input: &str) -> IResult<&str, Scan> {
            let (input, _) = multispace0(input)?;
            let (input, _) = tag("<Scan")(input)?;
            let (input, id) = attribute("id")(input)?;
            let (input, file) = attribute("file")(input)?;
            let (input, _) = char('>')(input)?;
            let (input, p) = pose(input)?;
            let (input, _) = multispace0(input)?;
            let (input, _) = tag("</Scan>")(input)?;
            Ok((
                input,
                Scan {
                    id: id.to_string(),
                    file: file.to_string(),
                    pose: p,
                },
            ))
        }

        fn model(input: &str) -> IResult<&str, ScanModel> {
            let (input, _) = multispace0(input)?;
            let (input, _) = tag("<ModelSet")(input)?;
            let (input, data_path) = attribute("datapath")(input)?;
            let (input, _) = char('>')(input)?;
            let (input, scans) = many0(scan)(input)?;
            let (input, _) = multispace0(input)?;
            let (input, _) = tag("</ModelSet>")(input)?;
            Ok((input, ScanModel::new(data_path.to_string(), scans)))
        }

        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        model(contents.as_ref()).map(|x| x.1).map_err(Error::from)
    }

    /// Write the scan-set description. Identifiers and file references are
    /// written back exactly as stored.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let mut file = BufWriter::new(File::create(path)?);
        writeln!(&mut file, "<ModelSet datapath=\"{}\">", self.data_path)?;
        for scan in &self.scans {
            writeln!(&mut file, "  <Scan id=\"{}\" file=\"{}\">", scan.id, scan.file)?;
            writeln!(&mut file, "    <Pose>")?;
            for r in 0..4 {
                writeln!(
                    &mut file,
                    "      {} {} {} {}",
                    scan.pose[0][r], scan.pose[1][r], scan.pose[2][r], scan.pose[3][r]
                )?;
            }
            writeln!(&mut file, "    </Pose>")?;
            writeln!(&mut file, "  </Scan>")?;
        }
        writeln!(&mut file, "</ModelSet>")?;
        Ok(())
    }

    /// Root directory that per-scan file references are relative to.
    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    pub fn set_data_path(&mut self, data_path: String) {
        self.data_path = data_path;
    }

    /// Resolve a scan's cloud file against the data set root.
    pub fn full_path(&self, scan: &Scan) -> PathBuf {
        Path::new(&self.data_path).join(&scan.file)
    }

    /// Common-frame position of scan `i`: its pose applied to the local
    /// origin. An approximation of the scan's location, not the cloud
    /// centroid.
    pub fn origin(&self, i: usize) -> Point3<f64> {
        self.scans[i].pose.transform_point(Point3::new(0.0, 0.0, 0.0))
    }

    pub fn num_scans(&self) -> usize {
        self.scans.len()
    }
}

#[test]
fn test_model_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.xml");

    let pose = Matrix4::from_translation(cgmath::Vector3::new(1.5, -2.0, 0.25));
    let model = ScanModel::new(
        "data".to_string(),
        vec![
            Scan {
                id: "scan000".to_string(),
                file: "scan000.pcd".to_string(),
                pose: Matrix4::from_scale(1.0),
            },
            Scan {
                id: "scan001".to_string(),
                file: "scan001.pcd".to_string(),
                pose,
            },
        ],
    );
    model.write(&path).unwrap();

    let m = ScanModel::from_file(&path).unwrap();
    assert_eq!(m.data_path(), "data");
    assert_eq!(m.num_scans(), 2);
    assert_eq!(m.scans[0].id, "scan000");
    assert_eq!(m.scans[1].file, "scan001.pcd");
    assert_eq!(m.scans[1].pose, pose);
}

#[test]
fn test_model_origin() {
    let model = ScanModel::new(
        ".".to_string(),
        vec![Scan {
            id: "a".to_string(),
            file: "a.pcd".to_string(),
            pose: Matrix4::from_translation(cgmath::Vector3::new(3.0, 4.0, 5.0)),
        }],
    );
    assert_eq!(model.origin(0), Point3::new(3.0, 4.0, 5.0));
}
