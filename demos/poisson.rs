use clap::{AppSettings, Parser};
use std::sync::Arc;
use terrace::boundary::{BcKind, BoundaryRegistry};
use terrace::coefficients::{face_space, Coefficients};
use terrace::geometry::DomainGeometry;
use terrace::grid_list::GridList;
use terrace::index_space::{range2d, Axis};
use terrace::linop::{BcMode, LinOp, NormKind};
use terrace::patch::Patch;
use terrace::stencil::{kernels, TensorOp};




/**
 * Solve a Poisson problem on the unit square with homogeneous Dirichlet
 * walls, using two-grid correction cycles built from the operator's smooth
 * / residual / restrict / interpolate pieces.
 */
#[derive(Debug, Parser)]
#[clap(version = "1.0")]
#[clap(setting = AppSettings::ColoredHelp)]
struct Opts {
    #[clap(short = 'n', long, default_value = "64")]
    resolution: i64,

    #[clap(short = 'c', long, default_value = "10")]
    cycles: usize,

    #[clap(long, default_value = "2")]
    fine_sweeps: usize,

    #[clap(long, default_value = "30")]
    coarse_sweeps: usize,
}




// ============================================================================
fn main() {
    simple_logger::SimpleLogger::new().init().unwrap();

    let opts = Opts::parse();
    let n = opts.resolution;
    let m = n / 2;
    let h = 1.0 / n as f64;

    let grids = GridList::new(vec![
        range2d(0..m, 0..m),
        range2d(m..n, 0..m),
        range2d(0..m, m..n),
        range2d(m..n, m..n),
    ]);
    let geometry = DomainGeometry::new(range2d(0..n, 0..n), (0.0, 0.0), (1.0, 1.0), (false, false));
    let registry = Arc::new(BoundaryRegistry::uniform(&grids, BcKind::Dirichlet, 0.0, 0.0));

    let mut op = LinOp::new(TensorOp, grids.clone(), geometry.clone(), (h, h), registry).unwrap();
    op.set_coefficients(Coefficients::Tensor {
        alpha: 0.0,
        beta: 1.0,
        a: grids.iter().map(|b| Patch::zeros(1, b.clone())).collect(),
        b: [
            grids.iter().map(|b| Patch::from_fn(face_space(b, Axis::I), |_| 1.0)).collect(),
            grids.iter().map(|b| Patch::from_fn(face_space(b, Axis::J), |_| 1.0)).collect(),
        ],
    }).unwrap();
    op.prepare_for_level(1).unwrap();

    log::info!("operator norm {:.3e}", op.norm(NormKind::MaxRowSum, 0, false).unwrap());

    let pi = std::f64::consts::PI;
    let rhs: Vec<_> = grids.iter().map(|b| {
        let geometry = geometry.clone();
        Patch::from_fn(b.clone(), move |index| {
            let (x, y) = geometry.cell_center(index);
            (2.0 * pi * x).sin() * (2.0 * pi * y).sin()
        })
    }).collect();

    let mut sol = op.make_field(0, 1, 1).unwrap();
    let mut res = op.make_field(0, 1, 0).unwrap();

    for cycle in 0..opts.cycles {

        for _ in 0..opts.fine_sweeps {
            op.smooth(&mut sol, &rhs, 0, BcMode::Inhomogeneous).unwrap();
        }
        op.residual(&mut res, &rhs, &mut sol, 0, BcMode::Inhomogeneous, false).unwrap();

        // restrict the fine residual to the coarse right-hand side
        let mut coarse_rhs = op.make_field(1, 1, 0).unwrap();
        for (block, crhs) in coarse_rhs.iter_mut().enumerate() {
            for index in op.grid_list(1).get(block).iter() {
                kernels::restrict_average(index, crhs, 0, &res[block], 0, None)
            }
        }

        // relax the coarse correction equation from a zero guess
        let mut correction = op.make_field(1, 1, 1).unwrap();
        for _ in 0..opts.coarse_sweeps {
            op.smooth(&mut correction, &coarse_rhs, 1, BcMode::Homogeneous).unwrap();
        }

        // prolong the correction and post-smooth
        for (block, sol) in sol.iter_mut().enumerate() {
            for index in op.grid_list(0).get(block).iter() {
                kernels::interp_add(index, sol, 0, &correction[block], 0, None)
            }
        }
        for _ in 0..opts.fine_sweeps {
            op.smooth(&mut sol, &rhs, 0, BcMode::Inhomogeneous).unwrap();
        }

        op.residual(&mut res, &rhs, &mut sol, 0, BcMode::Inhomogeneous, false).unwrap();
        let norm = res.iter().fold(0.0, |a, p| f64::max(a, p.max_abs()));
        log::info!("cycle {:2} residual {:.3e}", cycle, norm);
    }
}
