//! End-to-end tests of the scoring head against the mock backbone.

use std::collections::HashMap;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{VarBuilder, VarMap};

use rear::{
    HeadConfig, HeadError, LossError, MockBackbone, ObjectiveMode, RankingLoss, RankingMode,
    ScoringHead,
};

const HIDDEN: usize = 8;
const VOCAB: usize = 16;
const GEN_SCORE: u32 = 11;
const RELEVANT: u32 = 12;
const IRRELEVANT: u32 = 13;

fn base_config() -> HeadConfig {
    HeadConfig::new(HIDDEN)
        .with_sentinels(GEN_SCORE, RELEVANT, IRRELEVANT)
        .with_group_size(2)
}

fn ones_head(config: HeadConfig) -> ScoringHead {
    let device = Device::Cpu;
    let weight = Tensor::ones((1, HIDDEN), DType::F32, &device).unwrap();
    let tensors = HashMap::from([("rel_score.weight".to_string(), weight)]);
    let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
    ScoringHead::new(vb, config).expect("head")
}

fn ids(rows: &[&[u32]]) -> Tensor {
    let flat: Vec<u32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Tensor::from_vec(flat, (rows.len(), rows[0].len()), &Device::Cpu).unwrap()
}

#[test]
fn combined_training_step_produces_head_gradients() {
    let device = Device::Cpu;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let head = ScoringHead::new(
        vb,
        base_config().with_mode(ObjectiveMode::Combined { beta: 0.5 }),
    )
    .unwrap();
    let backbone = MockBackbone::new(HIDDEN, VOCAB, &device);

    let input_ids = ids(&[&[1, GEN_SCORE, 2, 3], &[4, 5, GEN_SCORE, 6]]);
    let labels = ids(&[&[GEN_SCORE, 2, 3, 0], &[5, GEN_SCORE, 6, 0]]);
    let rel_labels = Tensor::from_vec(vec![1.0f32, 0.0], 2, &device).unwrap();

    let output = head
        .forward(&backbone, &input_ids, None, Some(&labels), Some(&rel_labels))
        .unwrap();

    let loss = output.loss.expect("combined loss");
    let loss_value = loss.to_scalar::<f32>().unwrap();
    assert!(loss_value.is_finite());

    // The ranking term must backpropagate into the learned projection.
    let grads = loss.backward().unwrap();
    let vars = varmap.all_vars();
    assert_eq!(vars.len(), 1);
    let grad = grads.get(&vars[0]).expect("gradient for rel_score.weight");
    let grad_norm = grad
        .sqr()
        .unwrap()
        .sum_all()
        .unwrap()
        .to_scalar::<f32>()
        .unwrap();
    assert!(grad_norm > 0.0, "projection gradient should be nonzero");
}

#[test]
fn gated_inference_forces_a_verdict_per_sequence() {
    let head = ones_head(base_config().with_mode(ObjectiveMode::ScoreGate { threshold: 100.0 }));
    let backbone = MockBackbone::new(HIDDEN, VOCAB, &Device::Cpu);

    // Mock hidden values grow with the row index: row 0 scores low, row 1
    // scores high.
    let input_ids = ids(&[&[1, GEN_SCORE, 2, 3], &[4, 5, GEN_SCORE, 6]]);
    let output = head
        .forward(&backbone, &input_ids, None, None, None)
        .unwrap();

    let scores = output.rel_scores_vec().unwrap().unwrap();
    assert!(scores[0] < 100.0 && scores[1] > 100.0);

    let logits = output.logits.expect("gate logits");
    let verdict = |row: usize, pos: usize, token: u32| -> f32 {
        logits
            .i((row, pos, token as usize))
            .unwrap()
            .to_scalar::<f32>()
            .unwrap()
    };
    assert_eq!(verdict(0, 1, IRRELEVANT), 100.0);
    assert_eq!(verdict(1, 2, RELEVANT), 100.0);
}

#[test]
fn gated_scoring_still_evaluates_ranking_loss_with_labels() {
    let head = ones_head(base_config().with_mode(ObjectiveMode::ScoreGate { threshold: 0.0 }));
    let backbone = MockBackbone::new(HIDDEN, VOCAB, &Device::Cpu);

    let input_ids = ids(&[&[1, GEN_SCORE, 2, 3], &[4, 5, GEN_SCORE, 6]]);
    let rel_labels = Tensor::from_vec(vec![1.0f32, 0.0], 2, &Device::Cpu).unwrap();

    let output = head
        .forward(&backbone, &input_ids, None, None, Some(&rel_labels))
        .unwrap();

    let engine = RankingLoss::new(RankingMode::Full, 2, 1.0, 0.0, 0.5).unwrap();
    let expected = engine
        .evaluate(output.rel_scores.as_ref().unwrap(), &rel_labels)
        .unwrap()
        .to_scalar::<f32>()
        .unwrap();

    let actual = output.loss_value().unwrap().unwrap();
    assert!((actual - expected).abs() < 1e-5);
}

#[test]
fn warm_up_head_drops_the_pairwise_contribution() {
    let backbone = MockBackbone::new(HIDDEN, VOCAB, &Device::Cpu);
    let input_ids = ids(&[&[1, GEN_SCORE, 2, 3], &[4, 5, GEN_SCORE, 6]]);
    let rel_labels = Tensor::from_vec(vec![1.0f32, 0.0], 2, &Device::Cpu).unwrap();

    let forward = |warm_up: bool| -> f32 {
        let head = ones_head(
            base_config()
                .with_mode(ObjectiveMode::Combined { beta: 1.0 })
                .with_warm_up(warm_up),
        );
        head.forward(&backbone, &input_ids, None, None, Some(&rel_labels))
            .unwrap()
            .loss_value()
            .unwrap()
            .unwrap()
    };

    let warm = forward(true);
    let full = forward(false);

    // Labels order the rows against the scores, so the pairwise term is
    // strictly positive; with coarse_weight = 0.5 the full objective sits
    // above half the warm-up objective by exactly that amount.
    assert!(full > 0.5 * warm);
}

#[test]
fn indivisible_relevance_batch_is_rejected() {
    let device = Device::Cpu;
    let head = ones_head(base_config().with_mode(ObjectiveMode::Combined { beta: 0.5 }));
    let backbone = MockBackbone::new(HIDDEN, VOCAB, &device);

    let input_ids = ids(&[
        &[1, GEN_SCORE, 2, 3],
        &[4, 5, GEN_SCORE, 6],
        &[7, GEN_SCORE, 8, 9],
    ]);
    let rel_labels = Tensor::from_vec(vec![1.0f32, 0.0, 0.5], 3, &device).unwrap();

    let result = head.forward(&backbone, &input_ids, None, None, Some(&rel_labels));
    assert!(matches!(
        result,
        Err(HeadError::Loss(LossError::BatchNotDivisible {
            len: 3,
            group_size: 2
        }))
    ));
}
