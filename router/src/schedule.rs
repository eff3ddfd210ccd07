use crate::net::NetView;

/// Orders nets by bounding-box half-perimeter, smallest first. Ties keep
/// their incoming order.
pub fn sort_by_half_perimeter(nets: &[NetView], indices: &mut [usize]) {
    indices.sort_by_key(|&i| nets[i].bounding_box().half_perimeter());
}

/// Splits `indices` into `buckets` groups whose bounding boxes are disjoint in
/// x, plus one trailing residual group for nets that straddle a split line.
///
/// Split lines sit at the x-centre quantiles of the input. Relative order is
/// preserved inside every group.
pub fn partition(nets: &[NetView], indices: &[usize], buckets: usize) -> Vec<Vec<usize>> {
    let buckets = buckets.max(1);
    let mut groups = vec![Vec::new(); buckets + 1];
    if indices.is_empty() {
        return groups;
    }

    let mut centers: Vec<i32> = indices.iter().map(|&i| nets[i].bounding_box().cx()).collect();
    centers.sort_unstable();
    let n = indices.len();
    let dividers: Vec<i32> = (1..buckets).map(|k| centers[k * n / buckets]).collect();

    for &i in indices {
        let bbox = nets[i].bounding_box();
        let (low, high) = (bbox.min.x, bbox.max.x);
        let slot = (0..buckets).find(|&k| {
            let above_left = k == 0 || low > dividers[k - 1];
            let below_right = k == buckets - 1 || high < dividers[k];
            above_left && below_right
        });
        groups[slot.unwrap_or(buckets)].push(i);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use gr_common::db::indices::NetId;
    use gr_common::geom::coord::GridCoord;

    fn net(id: usize, x0: i32, x1: i32, y0: i32, y1: i32) -> NetView {
        NetView::from_access_points(
            NetId::new(id),
            format!("n{}", id),
            vec![vec![GridCoord::new(x0, y0, 1)], vec![GridCoord::new(x1, y1, 1)]],
        )
    }

    #[test]
    fn sort_is_stable_by_half_perimeter() {
        let nets = vec![net(0, 0, 5, 0, 5), net(1, 0, 1, 0, 1), net(2, 3, 4, 3, 4), net(3, 0, 2, 0, 0)];
        let mut order: Vec<usize> = (0..nets.len()).collect();
        sort_by_half_perimeter(&nets, &mut order);
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn buckets_are_disjoint_in_x() {
        // Every net spans the full height, so only x separates them.
        let mut nets = Vec::new();
        for i in 0..64 {
            let x = (i * 7 % 61) as i32 * 4;
            let width = (i % 5) as i32 * 3;
            nets.push(net(i, x, x + width, 0, 100));
        }
        let indices: Vec<usize> = (0..nets.len()).collect();
        let groups = partition(&nets, &indices, 8);
        assert_eq!(groups.len(), 9);
        assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), nets.len());

        for a in 0..8 {
            for b in a + 1..8 {
                for &i in &groups[a] {
                    for &j in &groups[b] {
                        let (bi, bj) = (nets[i].bounding_box(), nets[j].bounding_box());
                        assert!(!bi.overlaps_x(bj), "nets {} and {} share x", i, j);
                    }
                }
            }
        }
    }

    #[test]
    fn single_bucket_takes_everything() {
        let nets = vec![net(0, 0, 9, 0, 0), net(1, 2, 3, 0, 0)];
        let groups = partition(&nets, &[1, 0], 1);
        assert_eq!(groups, vec![vec![1, 0], vec![]]);
        assert!(partition(&nets, &[], 4).iter().all(Vec::is_empty));
    }
}
